//! Status precedence and display-name properties.

use ftx_campaign::status::display_name;
use ftx_campaign::SimulationStatus;
use proptest::prelude::*;

/// Reference precedence: the first true predicate wins.
fn expected(p: [bool; 6]) -> SimulationStatus {
    if !p[0] {
        return SimulationStatus::NotStarted;
    }
    let ordered = [
        (p[1], SimulationStatus::Queueing),
        (p[2], SimulationStatus::Running),
        (p[3], SimulationStatus::ExceededTimeLimit),
        (p[4], SimulationStatus::Finished),
        (p[5], SimulationStatus::Failed),
    ];
    ordered
        .into_iter()
        .find_map(|(set, status)| set.then_some(status))
        .unwrap_or(SimulationStatus::Unknown)
}

#[test]
fn test_all_predicate_combinations() {
    for bits in 0u8..64 {
        let p: [bool; 6] = std::array::from_fn(|i| bits & (1 << i) != 0);
        let status = SimulationStatus::from_predicates(p[0], p[1], p[2], p[3], p[4], p[5]);
        assert_eq!(status, expected(p), "predicates {p:?}");
    }
}

#[test]
fn test_unknown_only_when_started_and_nothing_else() {
    let unknown = (0u8..64)
        .filter(|bits| {
            let p: [bool; 6] = std::array::from_fn(|i| bits & (1 << i) != 0);
            SimulationStatus::from_predicates(p[0], p[1], p[2], p[3], p[4], p[5])
                == SimulationStatus::Unknown
        })
        .collect::<Vec<_>>();
    assert_eq!(unknown, [1]);
}

#[test]
fn test_terminal_statuses() {
    let terminal: Vec<SimulationStatus> = [
        SimulationStatus::NotStarted,
        SimulationStatus::Queueing,
        SimulationStatus::Running,
        SimulationStatus::ExceededTimeLimit,
        SimulationStatus::Finished,
        SimulationStatus::Failed,
        SimulationStatus::Unknown,
    ]
    .into_iter()
    .filter(|s| s.is_terminal())
    .collect();
    assert_eq!(
        terminal,
        [SimulationStatus::Finished, SimulationStatus::Failed]
    );
}

proptest! {
    #[test]
    fn prop_restart_display_name(base in "[a-z][a-z0-9_]{0,12}", n in 1usize..1000) {
        let name = format!("restart_{base}_{n}");
        prop_assert_eq!(display_name(&base, &name), format!("{base} (restart {n})"));
    }

    #[test]
    fn prop_init_display_name(base in "[a-z][a-z0-9_]{0,12}") {
        let name = format!("init_{base}");
        prop_assert_eq!(display_name(&base, &name), format!("{base} (init)"));
    }

    #[test]
    fn prop_other_names_show_base(base in "[a-z]{1,8}", name in "[a-h][a-z0-9]{0,12}") {
        prop_assert_eq!(display_name(&base, &name), base.clone());
    }
}
