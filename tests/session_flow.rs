use std::collections::BTreeMap;

use assert_matches::assert_matches;
use matrixlab_lib::{
    export::{self, Column},
    grid::ScriptedGrid,
    models::{AbandonReason, BlockSurvey, ConditionKind, FinalSurvey, YearOfStudy},
    session::{Direction, FixedOrder, RandomShuffler},
    utils::ManualClock,
    Effect, ExperimentConfig, Phase, Session, SessionError,
};

fn config() -> ExperimentConfig {
    ExperimentConfig {
        total_blocks: 3,
        payout_per_correct: 1000,
        block_duration_secs: 10,
        ..ExperimentConfig::default()
    }
}

fn fixed_session(zero_counts: Vec<u32>) -> (Session, ManualClock) {
    let clock = ManualClock::default();
    let session = Session::new(
        config(),
        Box::new(FixedOrder::new([
            ConditionKind::High,
            ConditionKind::Low,
            ConditionKind::Control,
        ])),
        Box::new(ScriptedGrid::new(zero_counts)),
        Box::new(clock.clone()),
    )
    .unwrap();
    (session, clock)
}

fn survey_for(kind: ConditionKind) -> BlockSurvey {
    BlockSurvey {
        satisfaction: 5,
        boredom: 3,
        recall: kind.requires_recall().then_some(30),
    }
}

fn final_survey() -> FinalSurvey {
    FinalSurvey {
        importance: 6,
        distraction: 2,
        age: 21,
        gender: "Female".into(),
        major: "Economics".into(),
        year_of_study: YearOfStudy::Year("Year 3".into()),
    }
}

fn expire_block(session: &mut Session, clock: &ManualClock) -> Vec<Effect> {
    let mut last = Vec::new();
    while session.timer_running() {
        clock.advance_secs(1);
        last = session.tick().unwrap();
    }
    last
}

/// Runs a whole session with a mix of answers, timeouts and manual stops.
fn run_full_session(session: &mut Session, clock: &ManualClock) {
    session.start(true).unwrap();
    for block in 0..3 {
        session.begin_block().unwrap();
        for guess in ["5", "4", "5"].iter().take(block + 1) {
            clock.advance_ms(700);
            session.submit_answer(guess).unwrap();
        }
        if block % 2 == 0 {
            expire_block(session, clock);
        } else {
            session.stop_early().unwrap();
        }
        let kind = session.conditions()[block].kind;
        session.submit_block_survey(survey_for(kind)).unwrap();
    }
    session.submit_final_survey(final_survey()).unwrap();
}

#[test]
fn attempt_ids_are_gapless_across_blocks() {
    let (mut session, clock) = fixed_session(vec![5]);
    run_full_session(&mut session, &clock);

    let ids: Vec<u64> = session.records().iter().map(|r| r.attempt_id).collect();
    let expected: Vec<u64> = (1..=ids.len() as u64).collect();
    assert_eq!(ids, expected);
    // 1 + 2 + 3 answers plus one abandonment per block.
    assert_eq!(ids.len(), 9);
}

#[test]
fn block_earnings_track_correct_answers() {
    let (mut session, _) = fixed_session(vec![5, 2, 9, 1, 6]);
    session.start(true).unwrap();
    session.begin_block().unwrap();

    for guess in ["5", "3", "9", "1", "0"] {
        session.submit_answer(guess).unwrap();
        let correct = session
            .records()
            .iter()
            .filter(|r| r.block_number == 1 && r.is_correct && !r.is_abandoned())
            .count() as u64;
        assert_eq!(session.block_earnings(), 1000 * correct);
    }
    assert_eq!(session.block_earnings(), 3000);
}

#[test]
fn block_backfill_only_touches_its_block() {
    let (mut session, _) = fixed_session(vec![5]);
    session.start(true).unwrap();

    session.begin_block().unwrap();
    session.submit_answer("5").unwrap();
    session.stop_early().unwrap();
    session.submit_block_survey(survey_for(ConditionKind::High)).unwrap();

    session.begin_block().unwrap();
    session.submit_answer("5").unwrap();
    session.stop_early().unwrap();

    for record in session.records() {
        match record.block_number {
            1 => assert_eq!(record.satisfaction, Some(5)),
            _ => assert_eq!(record.satisfaction, None),
        }
        assert!(record.demographics.is_none());
    }
}

#[test]
fn final_backfill_touches_every_record() {
    let (mut session, clock) = fixed_session(vec![5]);
    run_full_session(&mut session, &clock);

    assert_eq!(session.phase(), Phase::Complete);
    let total = session.total_earnings();
    assert!(session
        .records()
        .iter()
        .all(|r| r.demographics.is_some() && r.total_earnings == Some(total)));
}

#[test]
fn condition_assignment_is_a_permutation() {
    let expected: BTreeMap<ConditionKind, usize> = config()
        .conditions
        .iter()
        .fold(BTreeMap::new(), |mut acc, c| {
            *acc.entry(c.kind).or_insert(0) += 1;
            acc
        });

    for _ in 0..20 {
        let mut session = Session::new(
            config(),
            Box::new(RandomShuffler),
            Box::new(ScriptedGrid::new([5])),
            Box::new(ManualClock::default()),
        )
        .unwrap();
        session.start(true).unwrap();
        let mut assigned = BTreeMap::new();
        for condition in session.conditions() {
            *assigned.entry(condition.kind).or_insert(0) += 1;
        }
        assert_eq!(assigned, expected);
    }
}

#[test]
fn timeout_scenario_logs_three_records() {
    let (mut session, clock) = fixed_session(vec![5, 5]);
    session.start(true).unwrap();
    session.begin_block().unwrap();

    session.submit_answer("5").unwrap();
    assert_eq!(session.block_earnings(), 1000);
    session.submit_answer("3").unwrap();
    assert_eq!(session.block_earnings(), 1000);

    let effects = expire_block(&mut session, &clock);
    assert!(effects.contains(&Effect::TimeUp));

    let records = session.records();
    assert_eq!(records.len(), 3);
    assert_eq!(
        records.iter().map(|r| r.attempt_id).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(records.iter().all(|r| r.block_number == 1));
    assert_eq!(records[2].abandonment, Some(AbandonReason::Timeout));
    assert!(!records[2].is_correct);
    assert_eq!(records[2].earnings_before, 1000);
    assert_eq!(session.phase(), Phase::PostBlockSurvey { block: 0 });
}

#[test]
fn manual_stop_without_answers_logs_one_abandonment() {
    let (mut session, _) = fixed_session(vec![5]);
    session.start(true).unwrap();
    session.begin_block().unwrap();
    session.stop_early().unwrap();

    let records = session.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].abandonment, Some(AbandonReason::Manual));
    assert_eq!(records[0].user_guess, None);
    assert_eq!(session.phase(), Phase::PostBlockSurvey { block: 0 });
}

#[test]
fn tab_switches_are_per_grid() {
    let (mut session, clock) = fixed_session(vec![5, 5]);
    session.start(true).unwrap();
    session.begin_block().unwrap();

    session.visibility(Direction::Out).unwrap();
    clock.advance_secs(4);
    session.visibility(Direction::In).unwrap();
    session.submit_answer("5").unwrap();

    let record = &session.records()[0];
    assert_eq!(record.tab_switch_count, 1);
    let entries: Vec<&str> = record.tab_switch_history.split(" | ").collect();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].starts_with("OUT: "));
    assert!(entries[1].starts_with("IN: "));

    assert_eq!(session.tab_switch_count(), 0);
    session.submit_answer("5").unwrap();
    assert_eq!(session.records()[1].tab_switch_count, 0);
    assert!(session.records()[1].tab_switch_history.is_empty());
}

#[test]
fn visibility_outside_task_is_ignored() {
    let (mut session, _) = fixed_session(vec![5]);
    session.start(true).unwrap();

    // BlockIntro
    assert!(session.visibility(Direction::Out).unwrap().is_empty());
    session.begin_block().unwrap();
    assert_eq!(session.tab_switch_count(), 0);

    session.stop_early().unwrap();
    // PostBlockSurvey
    session.visibility(Direction::Out).unwrap();
    session.visibility(Direction::In).unwrap();
    assert_eq!(session.tab_switch_count(), 0);

    session.submit_block_survey(survey_for(ConditionKind::High)).unwrap();
    session.begin_block().unwrap();
    session.submit_answer("5").unwrap();

    assert!(session
        .records()
        .iter()
        .all(|r| r.tab_switch_count == 0 && r.tab_switch_history.is_empty()));
}

#[test]
fn ticks_after_block_end_are_inert() {
    let (mut session, clock) = fixed_session(vec![5]);
    assert!(session.tick().unwrap().is_empty());

    session.start(true).unwrap();
    session.begin_block().unwrap();
    session.stop_early().unwrap();
    let logged = session.records().len();

    for _ in 0..20 {
        clock.advance_secs(1);
        assert!(session.tick().unwrap().is_empty());
    }
    assert_eq!(session.records().len(), logged);
    assert_eq!(session.phase(), Phase::PostBlockSurvey { block: 0 });
}

#[test]
fn survey_out_of_phase_fails_loudly() {
    let (mut session, _) = fixed_session(vec![5]);
    session.start(true).unwrap();
    session.begin_block().unwrap();

    assert_matches!(
        session.submit_block_survey(survey_for(ConditionKind::High)),
        Err(SessionError::InvalidTransition { .. })
    );
    assert_matches!(
        session.submit_final_survey(final_survey()),
        Err(SessionError::InvalidTransition { .. })
    );
    assert_eq!(session.phase(), Phase::TaskActive { block: 0 });
}

#[test]
fn full_session_exports_default_columns() {
    let (mut session, clock) = fixed_session(vec![5]);
    assert_matches!(session.export_all(), Err(SessionError::EmptyExport));

    run_full_session(&mut session, &clock);
    let records = session.export_all().unwrap();
    let csv = export::to_csv(records, Column::DEFAULT).unwrap();

    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), records.len() + 1);
    let header: Vec<&str> = lines[0].split(',').collect();
    let recall_col = header.iter().position(|h| *h == "Peer_Recall_Guess").unwrap();

    // Block 3 is Control: recall suppressed.
    for (record, line) in records.iter().zip(&lines[1..]) {
        let cells: Vec<&str> = line.split(',').collect();
        let expected = if record.condition == ConditionKind::Control {
            "N/A"
        } else {
            "30"
        };
        assert_eq!(cells[recall_col], expected);
    }
}
