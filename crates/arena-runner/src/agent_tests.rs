use super::*;
use std::sync::Mutex;

/// Backend replaying canned replies, recording every context it saw.
struct Scripted {
    replies: Mutex<Vec<anyhow::Result<String>>>,
    seen: Mutex<Vec<MoveContext>>,
}

impl Scripted {
    fn new(replies: Vec<anyhow::Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies),
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl AgentBackend for Scripted {
    async fn request_move(&self, context: &MoveContext) -> anyhow::Result<String> {
        self.seen.lock().unwrap().push(context.clone());
        self.replies.lock().unwrap().remove(0)
    }
}

struct Silent;

#[async_trait]
impl AgentBackend for Silent {
    async fn request_move(&self, _context: &MoveContext) -> anyhow::Result<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }
}

#[test]
fn test_extract_marked_move() {
    let pos = Position::startpos();
    let mv = extract_move(&pos, "My move: \"Nf3\"\nDevelops a knight.").unwrap();
    assert_eq!(pos.to_san(mv).unwrap(), "Nf3");

    let mv = extract_move(&pos, "My move: 'e4' because the centre matters").unwrap();
    assert_eq!(pos.to_san(mv).unwrap(), "e4");
}

#[test]
fn test_extract_move_from_free_text() {
    let pos = Position::startpos();
    let mv = extract_move(&pos, "I think d4, taking space.").unwrap();
    assert_eq!(pos.to_san(mv).unwrap(), "d4");
}

#[test]
fn test_illegal_marked_move_falls_through_to_tokens() {
    let pos = Position::startpos();
    let mv = extract_move(&pos, "My move: \"Qh5\"\nor maybe c4").unwrap();
    assert_eq!(pos.to_san(mv).unwrap(), "c4");
}

#[test]
fn test_no_move_in_reply() {
    assert!(extract_move(&Position::startpos(), "I resign, good game").is_none());
}

#[test]
fn test_extract_explanation() {
    let text = extract_explanation("1. My move: \"e4\"\n2. Controls the centre.\nOpens lines.");
    assert_eq!(text.as_deref(), Some("Controls the centre. Opens lines."));
    assert!(extract_explanation("My move: \"e4\"").is_none());
    assert!(extract_explanation("e4").is_none());
}

#[test]
fn test_context_and_prompt() {
    let pos = Position::startpos();
    let ctx = MoveContext::new("gpt", &pos, &[]);
    assert_eq!(ctx.legal_moves.len(), 20);
    assert_eq!(ctx.move_number, 1);
    assert!(ctx.last_move.is_none());

    let prompt = ctx.prompt();
    assert!(prompt.contains(&pos.fen()));
    assert!(prompt.contains("My move:"));
    assert!(prompt.contains("game start"));
}

#[tokio::test]
async fn test_agent_source_plays_reply() {
    let backend = Scripted::new(vec![Ok("My move: \"e4\"\nClassical.".to_string())]);
    let mut source = AgentSource::new("gpt", backend.clone(), Duration::from_secs(5));
    let pos = Position::startpos();

    let proposed = source.next_move(&pos, &[]).await.unwrap().unwrap();
    assert_eq!(proposed.origin, MoveOrigin::Agent);
    assert_eq!(pos.to_san(proposed.mv).unwrap(), "e4");
    assert_eq!(proposed.explanation.as_deref(), Some("Classical."));
    assert_eq!(backend.seen.lock().unwrap()[0].model, "gpt");
}

#[tokio::test]
async fn test_agent_source_falls_back_to_first_legal() {
    let backend = Scripted::new(vec![Ok("no idea".to_string())]);
    let mut source = AgentSource::new("gpt", backend, Duration::from_secs(5));
    let pos = Position::startpos();

    let proposed = source.next_move(&pos, &[]).await.unwrap().unwrap();
    assert_eq!(proposed.origin, MoveOrigin::Fallback);
    assert_eq!(proposed.mv, pos.legal_moves()[0]);
}

#[tokio::test]
async fn test_backend_failure_is_source_unavailable() {
    let backend = Scripted::new(vec![Err(anyhow::anyhow!("rate limited"))]);
    let mut source = AgentSource::new("gpt", backend, Duration::from_secs(5));

    let err = source.next_move(&Position::startpos(), &[]).await.unwrap_err();
    match err {
        ArenaError::SourceUnavailable { participant, reason } => {
            assert_eq!(participant, "gpt");
            assert!(reason.contains("rate limited"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_backend_timeout_is_source_unavailable() {
    let mut source = AgentSource::new("slow", Arc::new(Silent), Duration::from_secs(30));
    let err = source.next_move(&Position::startpos(), &[]).await.unwrap_err();
    assert!(matches!(err, ArenaError::SourceUnavailable { .. }));
}
