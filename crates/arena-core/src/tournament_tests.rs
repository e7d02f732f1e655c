use super::*;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_pairing_and_game_counts() {
    for n in 2..=6usize {
        for g in 1..=3u32 {
            let participants: Vec<String> = (0..n).map(|i| format!("p{i}")).collect();
            let pairings = round_robin_pairings(&participants);
            assert_eq!(pairings.len(), n * (n - 1));

            let distinct: HashSet<_> = pairings.iter().collect();
            assert_eq!(distinct.len(), n * (n - 1));
            assert!(pairings.iter().all(|p| p.white != p.black));

            let schedule = build_schedule(&pairings, g);
            assert_eq!(schedule.len(), n * (n - 1) * g as usize);
        }
    }
}

#[test]
fn test_schedule_repeats_are_consecutive() {
    let pairings = round_robin_pairings(&names(&["a", "b"]));
    let schedule = build_schedule(&pairings, 2);
    let order: Vec<(usize, u32)> = schedule.iter().map(|g| (g.pairing_index, g.game)).collect();
    assert_eq!(order, vec![(0, 1), (0, 2), (1, 1), (1, 2)]);
    assert_eq!(schedule[0].white, "a");
    assert_eq!(schedule[2].white, "b");
}

#[test]
fn test_validation() {
    assert!(validate_participants(&names(&["a", "b"]), 1).is_ok());
    assert!(matches!(
        validate_participants(&names(&["a"]), 1),
        Err(ArenaError::InvalidTournamentConfig(_))
    ));
    assert!(matches!(
        validate_participants(&names(&["a", "b", "a"]), 1),
        Err(ArenaError::InvalidTournamentConfig(_))
    ));
    assert!(matches!(
        validate_participants(&names(&["a", "b"]), 0),
        Err(ArenaError::InvalidTournamentConfig(_))
    ));
    assert!(validate_participants(&names(&["a", " "]), 1).is_err());
}

#[test]
fn test_snapshot_totals() {
    let snapshot = TournamentSnapshot::new(TournamentId::new(), names(&["a", "b", "c"]), 2);
    assert_eq!(snapshot.pairings.len(), 6);
    assert_eq!(snapshot.total_games, 12);
    assert_eq!(snapshot.status, TournamentStatus::Playing);
}
