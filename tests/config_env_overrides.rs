//! Environment overrides run in their own test binary so the variables they
//! set never leak into file-based loading tests.

use stack_reconciler::config::{ReconcilerConfig, StoreBackend};
use tokio_test::assert_ok;

const VARIABLES: [(&str, &str); 5] = [
    ("RECONCILER__ORCHESTRATOR__REGION", "eu-north-1"),
    ("RECONCILER__ORCHESTRATOR__ACCOUNT_ID", "012345678901"),
    (
        "RECONCILER__NOTIFICATION_CHANNEL_ARN",
        "arn:aws:sns:eu-north-1:012345678901:deploy-events",
    ),
    ("RECONCILER__STORE__BACKEND", "memory"),
    ("RECONCILER__STORE__TABLE_NAME", "records_2024"),
];

#[test]
fn test_environment_values_are_kept_verbatim() {
    for (key, value) in VARIABLES {
        std::env::set_var(key, value);
    }

    let loaded = ReconcilerConfig::load(None);

    for (key, _) in VARIABLES {
        std::env::remove_var(key);
    }
    let config = assert_ok!(loaded);

    assert_eq!(config.orchestrator.account_id, "012345678901");
    assert_eq!(config.orchestrator.region, "eu-north-1");
    assert_eq!(
        config.notification_channel_arn,
        "arn:aws:sns:eu-north-1:012345678901:deploy-events"
    );
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert_eq!(config.store.table_name, "records_2024");
}
