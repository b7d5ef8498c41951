use proptest::prelude::*;

/// Execution ids as the workflow engine issues them
pub fn execution_id_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{2,24}"
}

pub fn error_code_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("ValidationError".to_string()),
        Just("AccessDenied".to_string()),
        Just("AlreadyExistsException".to_string()),
        Just("Throttling".to_string()),
        "[A-Za-z]{1,20}",
    ]
}

/// Arbitrary backend wording, sometimes containing the fragments the classifier matches
pub fn error_message_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("No updates are to be performed.".to_string()),
        Just("Stack with id network does not exist".to_string()),
        Just(
            "Stack:arn:aws:cloudformation:eu-west-1:111111111111:stack/network/1 \
             is in ROLLBACK_COMPLETE state and can not be updated."
                .to_string()
        ),
        Just("S3 error: Access Denied".to_string()),
        "[ -~]{0,80}",
    ]
}

pub fn stack_status_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "CREATE_IN_PROGRESS",
        "CREATE_COMPLETE",
        "CREATE_FAILED",
        "UPDATE_IN_PROGRESS",
        "UPDATE_COMPLETE",
        "UPDATE_FAILED",
        "UPDATE_ROLLBACK_COMPLETE",
        "ROLLBACK_COMPLETE",
        "DELETE_IN_PROGRESS",
        "DELETE_COMPLETE",
        "DELETE_FAILED",
    ])
    .prop_map(str::to_string)
}
