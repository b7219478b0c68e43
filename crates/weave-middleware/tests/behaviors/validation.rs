use std::sync::atomic::{AtomicU32, Ordering};

use weave_core::{
    Argument, ArgumentCheckSettings, ArgumentError, CallContext, CallSite, InterceptorChain,
};
use weave_middleware::ArgumentCheckAdvice;

use super::StoreError;

fn site() -> CallSite {
    CallSite::new("Accounts", "open").with_parameters(["owner", "currency"])
}

fn guarded(checks: &[ArgumentCheckSettings]) -> InterceptorChain<u32, StoreError> {
    let site = site();
    checks.iter().fold(InterceptorChain::new(), |chain, check| {
        chain.with_advice(ArgumentCheckAdvice::new(&site, check).expect("known parameter"))
    })
}

#[test]
fn null_argument_is_rejected_before_the_call() {
    let chain = guarded(&[ArgumentCheckSettings::by_name("owner")]);
    let site = site();
    let executed = AtomicU32::new(0);

    let call = CallContext::new(&site).with_arguments([
        Argument::null("owner"),
        Argument::text("currency", "EUR"),
    ]);
    let result = chain.invoke(&call, || {
        executed.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    });

    assert_eq!(
        result,
        Err(StoreError::Invalid(ArgumentError::Null {
            site: "Accounts.open".into(),
            name: "owner".into(),
        }))
    );
    assert_eq!(executed.load(Ordering::SeqCst), 0);
}

#[test]
fn empty_text_is_rejected_only_when_requested() {
    let site = site();
    let call = CallContext::new(&site).with_arguments([
        Argument::text("owner", "ada"),
        Argument::text("currency", ""),
    ]);

    let lenient = guarded(&[ArgumentCheckSettings::by_index(1)]);
    assert_eq!(lenient.invoke(&call, || Ok(1)), Ok(1));

    let strict = guarded(&[ArgumentCheckSettings::by_index(1).reject_empty(true)]);
    assert_eq!(
        strict.invoke(&call, || Ok(1)),
        Err(StoreError::Invalid(ArgumentError::Empty {
            site: "Accounts.open".into(),
            name: "currency".into(),
        }))
    );
}

#[test]
fn present_arguments_pass_every_check() {
    let chain = guarded(&[
        ArgumentCheckSettings::by_name("OWNER").reject_empty(true),
        ArgumentCheckSettings::by_name("currency").reject_empty(true),
    ]);
    let site = site();
    let balance = 0_u32;
    let call = CallContext::new(&site).with_arguments([
        Argument::text("owner", "ada"),
        Argument::debug("currency", &balance),
    ]);
    assert_eq!(chain.invoke(&call, || Ok(9)), Ok(9));
}

#[test]
fn unknown_parameter_fails_at_setup() {
    let site = site();
    assert!(ArgumentCheckAdvice::new(&site, &ArgumentCheckSettings::by_name("iban")).is_err());
    assert!(ArgumentCheckAdvice::new(&site, &ArgumentCheckSettings::default()).is_err());
}
