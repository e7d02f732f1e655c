use super::*;
use arena_core::TieBreak;
use arena_runner::SourceResolver;

#[test]
fn test_full_config() {
    let config = ServerConfig::parse(
        r#"
        [arena]
        max_plies = 120
        tournament_pacing_ms = 0
        tie_break = "most_wins"

        [arena.rating]
        k_provisional = 40.0

        [storage]
        database_url = "sqlite::memory:"
        ratings_path = "out/elo.json"

        [logging]
        level = "debug"

        [[models]]
        name = "gpt-4o"
        provider = "openai"

        [[models]]
        name = "old-model"
        active = false
        "#,
    )
    .unwrap();

    assert_eq!(config.arena.max_plies, 120);
    assert_eq!(config.arena.tournament_pacing_ms, 0);
    assert_eq!(config.arena.tournament_opening, "1. e4");
    assert_eq!(config.arena.tie_break, TieBreak::MostWins);
    assert_eq!(config.arena.rating.k_provisional, 40.0);
    assert_eq!(config.arena.rating.k_established, 16.0);
    assert_eq!(config.storage.database_url, "sqlite::memory:");
    assert_eq!(config.storage.ratings_path, PathBuf::from("out/elo.json"));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.models.len(), 2);
    assert_eq!(config.models[0].rating, 1500);
    assert!(config.models[0].active);
    assert!(!config.models[1].active);
    assert!(config.agent.command.is_empty());
}

#[test]
fn test_empty_config_is_default() {
    assert_eq!(ServerConfig::parse("").unwrap(), ServerConfig::default());
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let path = std::env::temp_dir().join("arena-config-that-does-not-exist.toml");
    assert_eq!(ServerConfig::load(&path).unwrap(), ServerConfig::default());
}

#[test]
fn test_bad_config_reports_path() {
    let path = std::env::temp_dir().join(format!("arena_bad_{}.toml", std::process::id()));
    std::fs::write(&path, "[arena]\nmax_plies = \"lots\"\n").unwrap();
    let err = ServerConfig::load(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(format!("{err:#}").contains("invalid config file"));
}

#[test]
fn test_roster_from_models() {
    let config = ServerConfig::parse(
        r#"
        [[models]]
        name = "a"

        [[models]]
        name = "b"
        active = false
        "#,
    )
    .unwrap();
    let roster = config.roster();
    assert_eq!(roster.models().len(), 2);
    assert!(roster.resolve("a").is_ok());
    assert!(roster.resolve("b").is_err());
    assert!(roster.resolve("first-legal").is_ok());
}
