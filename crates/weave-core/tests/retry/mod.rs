//! 重试执行器集成测试：成功路径、耗尽后抛出或吞掉、不匹配错误策略、等待序列与日志。

use std::{cell::Cell, io, sync::Arc, time::Duration};

use thiserror::Error;
use weave_core::{
    ErrorFilter, LogLevel, RetryExecutor, RetryOutcome, RetryPolicy, RetrySettings,
    UnmatchedErrorPolicy,
    test_stubs::{observability::RecordingLogger, retry::RecordingPause},
};

#[derive(Debug, Error, PartialEq, Eq)]
enum GatewayError {
    #[error("gateway timed out (attempt {0})")]
    Timeout(u32),
    #[error("request rejected")]
    Rejected,
}

fn timeouts_only() -> ErrorFilter<GatewayError> {
    ErrorFilter::when("timeout", |error: &GatewayError| {
        matches!(error, GatewayError::Timeout(_))
    })
}

fn executor(
    policy: RetryPolicy<GatewayError>,
) -> (RetryExecutor<GatewayError>, Arc<RecordingLogger>, Arc<RecordingPause>) {
    let logger = Arc::new(RecordingLogger::new());
    let pause = Arc::new(RecordingPause::new());
    let executor = RetryExecutor::new(policy)
        .with_logger(logger.clone())
        .with_pause(pause.clone());
    (executor, logger, pause)
}

/// 失败 `max - 1` 次后成功：整体成功，恰好 `max - 1` 条 info 日志，没有错误抛出。
#[test]
fn succeeds_after_max_minus_one_failures() {
    const MAX: u32 = 4;
    let (executor, logger, _pause) = executor(RetryPolicy::new(MAX).expect("policy"));
    let calls = Cell::new(0u32);

    let outcome = executor
        .execute(|| {
            calls.set(calls.get() + 1);
            if calls.get() < MAX {
                Err(GatewayError::Timeout(calls.get()))
            } else {
                Ok("delivered")
            }
        })
        .expect("no error surfaces");

    assert_eq!(
        outcome,
        RetryOutcome::Succeeded {
            value: "delivered",
            attempts: MAX
        }
    );
    assert_eq!(logger.count(LogLevel::Info), (MAX - 1) as usize);
    assert_eq!(logger.count(LogLevel::Error), 0);
    assert_eq!(
        logger.entries()[0].error.as_deref(),
        Some("gateway timed out (attempt 1)")
    );
}

/// 匹配错误连续失败 `max` 次且 raise=true：原始错误原样返回，尝试次数恰为 `max`。
#[test]
fn exhaustion_reraises_the_original_error() {
    let (executor, logger, _pause) = executor(
        RetryPolicy::new(3)
            .expect("policy")
            .with_filter(timeouts_only())
            .with_message("payment gateway"),
    );
    let executor = executor.with_operation("Payments.charge");
    let calls = Cell::new(0u32);

    let error = executor
        .execute(|| -> Result<(), _> {
            calls.set(calls.get() + 1);
            Err(GatewayError::Timeout(calls.get()))
        })
        .expect_err("exhausted");

    assert_eq!(error, GatewayError::Timeout(3));
    assert_eq!(calls.get(), 3);
    assert_eq!(
        logger.messages_at(LogLevel::Info),
        [
            "Payments.charge: attempt 1 of 3 failed, retrying",
            "Payments.charge: attempt 2 of 3 failed, retrying",
        ]
    );
    assert_eq!(
        logger.messages_at(LogLevel::Error),
        ["payment gateway Payments.charge: giving up after 3 attempts"]
    );
}

/// raise=false：耗尽后吞掉错误，调用方看到无错误的完成。
#[test]
fn exhaustion_can_be_swallowed() {
    let (executor, logger, _pause) = executor(
        RetryPolicy::new(2)
            .expect("policy")
            .raise_after_retries(false),
    );
    let calls = Cell::new(0u32);

    let outcome = executor
        .execute(|| -> Result<u8, _> {
            calls.set(calls.get() + 1);
            Err(GatewayError::Timeout(calls.get()))
        })
        .expect("swallowed");

    assert_eq!(outcome, RetryOutcome::Exhausted { attempts: 2 });
    assert_eq!(calls.get(), 2);
    assert_eq!(logger.count(LogLevel::Error), 1);
}

#[test]
fn unmatched_error_propagates_by_default() {
    let (executor, logger, pause) = executor(
        RetryPolicy::new(5)
            .expect("policy")
            .with_filter(timeouts_only())
            .with_delay(Duration::from_millis(10)),
    );
    let calls = Cell::new(0u32);

    let error = executor
        .execute(|| -> Result<(), _> {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                Err(GatewayError::Timeout(1))
            } else {
                Err(GatewayError::Rejected)
            }
        })
        .expect_err("propagated");

    assert_eq!(error, GatewayError::Rejected);
    assert_eq!(calls.get(), 2);
    assert_eq!(logger.count(LogLevel::Info), 1);
    assert_eq!(logger.count(LogLevel::Error), 0);
    assert_eq!(pause.pauses(), [Duration::from_millis(10)]);
}

#[test]
fn unmatched_error_can_be_abandoned_silently() {
    let (executor, logger, _pause) = executor(
        RetryPolicy::new(5)
            .expect("policy")
            .with_filter(timeouts_only())
            .with_unmatched(UnmatchedErrorPolicy::Swallow),
    );

    let outcome = executor
        .execute(|| -> Result<(), _> { Err(GatewayError::Rejected) })
        .expect("abandoned");

    assert_eq!(outcome, RetryOutcome::Abandoned { attempts: 1 });
    assert!(logger.is_empty());
}

/// 第一次尝试前从不等待，之后每次尝试前等待配置的延迟。
#[test]
fn delay_is_paused_between_attempts_only() {
    let delay = Duration::from_millis(25);
    let (executor, _logger, pause) = executor(
        RetryPolicy::new(3)
            .expect("policy")
            .with_delay(delay)
            .raise_after_retries(false),
    );

    executor
        .execute(|| -> Result<(), _> { Err(GatewayError::Timeout(0)) })
        .expect("swallowed");
    assert_eq!(pause.pauses(), [delay, delay]);

    pause_free_when_first_attempt_succeeds();
}

fn pause_free_when_first_attempt_succeeds() {
    let (executor, logger, pause) = executor(
        RetryPolicy::new(3)
            .expect("policy")
            .with_delay(Duration::from_secs(1)),
    );
    let outcome = executor.execute(|| Ok::<_, GatewayError>(7)).expect("ok");
    assert_eq!(outcome.attempts(), 1);
    assert!(pause.pauses().is_empty());
    assert!(logger.is_empty());
}

#[derive(Debug, Error)]
enum ClientError {
    #[error("transport failure")]
    Transport(#[source] io::Error),
    #[error("invalid payload")]
    Payload,
}

#[test]
fn type_filter_matches_through_the_source_chain() {
    let executor = RetryExecutor::new(
        RetryPolicy::new(2)
            .expect("policy")
            .with_filter(ErrorFilter::<ClientError>::of::<io::Error>()),
    )
    .with_logger(Arc::new(RecordingLogger::new()))
    .with_pause(Arc::new(RecordingPause::new()));
    let calls = Cell::new(0u32);

    let outcome = executor.execute(|| {
        calls.set(calls.get() + 1);
        match calls.get() {
            1 => Err(ClientError::Transport(io::Error::other("reset"))),
            _ => Ok(calls.get()),
        }
    });
    assert_eq!(outcome.ok().and_then(RetryOutcome::into_value), Some(2));

    let error = executor
        .execute(|| -> Result<(), _> { Err(ClientError::Payload) })
        .expect_err("not retried");
    assert!(matches!(error, ClientError::Payload));
}

#[test]
fn policy_from_settings_carries_every_knob() {
    let settings = RetrySettings {
        max_retries: 4,
        delay_ms: 50,
        raise_after_retries: false,
        message: Some("sync".into()),
        unmatched: UnmatchedErrorPolicy::Swallow,
    };
    let policy = RetryPolicy::<GatewayError>::from_settings(&settings).expect("valid");
    assert_eq!(policy.max_retries(), 4);
    assert_eq!(policy.delay(), Duration::from_millis(50));
    assert!(!policy.raises_after_retries());
    assert_eq!(policy.message(), Some("sync"));
    assert_eq!(policy.unmatched(), UnmatchedErrorPolicy::Swallow);

    let invalid = RetrySettings {
        max_retries: 0,
        ..RetrySettings::default()
    };
    assert!(RetryPolicy::<GatewayError>::from_settings(&invalid).is_err());
}
