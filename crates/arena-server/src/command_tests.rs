use super::*;
use arena_core::Position;

fn context() -> MoveContext {
    MoveContext::new("test-model", &Position::startpos(), &[])
}

#[test]
fn test_from_argv() {
    assert!(CommandBackend::from_argv(&[]).is_none());
    let backend = CommandBackend::from_argv(&["python3".to_string(), "ask.py".to_string()]).unwrap();
    assert_eq!(backend, CommandBackend::new("python3", vec!["ask.py".to_string()]));
}

#[cfg(unix)]
#[tokio::test]
async fn test_reply_is_program_output() {
    let backend = CommandBackend::new(
        "sh",
        vec!["-c".to_string(), "echo \"My move: \\\"Nf3\\\" for $ARENA_MODEL\"".to_string()],
    );
    let reply = backend.request_move(&context()).await.unwrap();
    assert_eq!(reply.trim(), "My move: \"Nf3\" for test-model");
}

#[cfg(unix)]
#[tokio::test]
async fn test_prompt_is_sent_on_stdin() {
    let backend = CommandBackend::new("cat", Vec::new());
    let reply = backend.request_move(&context()).await.unwrap();
    assert!(reply.contains("Your legal moves:"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_failing_program_is_an_error() {
    let backend = CommandBackend::new("sh", vec!["-c".to_string(), "echo boom >&2; exit 3".to_string()]);
    let err = backend.request_move(&context()).await.unwrap_err();
    assert!(err.to_string().contains("boom"));
}

#[tokio::test]
async fn test_missing_program_is_an_error() {
    let backend = CommandBackend::new("definitely-not-an-agent-binary", Vec::new());
    assert!(backend.request_move(&context()).await.is_err());
}
