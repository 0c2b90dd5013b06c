//! Property-based tests for the substring block policy

use proptest::prelude::*;
use vision::hostname::{is_blocked, normalize_hostname};

/// Any hostname containing a block entry is blocked.
#[test]
fn test_containing_hostname_is_blocked() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &("[a-z]{0,6}", "[a-z]{1,6}", "[a-z]{0,6}"),
            |(prefix, entry, suffix)| {
                let hostname = format!("{}{}{}.com", prefix, entry, suffix);
                prop_assert!(is_blocked(&hostname, &[entry.clone()]));
                Ok(())
            },
        )
        .unwrap();
}

/// Normalizing twice changes nothing.
#[test]
fn test_normalize_is_idempotent() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &("[a-zA-Z]{1,10}\\.[a-z]{2,4}", "(/[a-z]{0,5}){0,3}"),
            |(host, path)| {
                let once = normalize_hostname(&format!("https://{}{}", host, path)).unwrap();
                let twice = normalize_hostname(&once).unwrap();
                prop_assert_eq!(&once, &twice);
                prop_assert_eq!(once, host.to_lowercase());
                Ok(())
            },
        )
        .unwrap();
}
