//! End-to-end tests for the participation state machine over SQLite.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use ideaflow::adapters::sqlite::{
    create_test_pool, all_embedded_migrations, Migrator, SqliteCatalogRepository,
    SqliteExperimentRepository, SqliteParticipationRepository,
};
use ideaflow::domain::models::{Experiment, ExperimentGroup, GroupRole, Idea, IdeasGroup, Reaction};
use ideaflow::domain::ports::{
    CatalogRepository, ExperimentRepository, Identity, ParticipationRepository, RngSampler,
};
use ideaflow::services::{ExperimentService, ParticipationService, StepOutcome};

type Repos = (
    Arc<SqliteExperimentRepository>,
    Arc<SqliteParticipationRepository>,
    Arc<SqliteCatalogRepository>,
);

struct Harness {
    experiments: Arc<SqliteExperimentRepository>,
    participations: Arc<SqliteParticipationRepository>,
    catalog: Arc<SqliteCatalogRepository>,
    service: ParticipationService<
        SqliteExperimentRepository,
        SqliteParticipationRepository,
        SqliteCatalogRepository,
    >,
    identity: Identity,
    experiment_id: Uuid,
}

async fn repos() -> Repos {
    let pool = create_test_pool().await.unwrap();
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await.unwrap();
    (
        Arc::new(SqliteExperimentRepository::new(pool.clone())),
        Arc::new(SqliteParticipationRepository::new(pool.clone())),
        Arc::new(SqliteCatalogRepository::new(pool)),
    )
}

/// Create an experiment with the given pool sizes, running, with a seeded sampler.
async fn harness(fixation: usize, expansion: usize, limit: i64, rate: f64, seed: u64) -> Harness {
    let (experiments, participations, catalog) = repos().await;

    let experiment = Experiment::new("egg drop", "protect the egg")
        .with_idea_limit(limit)
        .with_starting_rate(rate)
        .with_running(true);
    experiments.create(&experiment).await.unwrap();

    for (role, count, name) in [
        (GroupRole::Fixation, fixation, "fixation pool"),
        (GroupRole::Expansion, expansion, "expansion pool"),
    ] {
        let group = IdeasGroup::new(name, "");
        catalog.create_group(&group).await.unwrap();
        for i in 0..count {
            let idea = Idea::new(format!("{name} idea {i}"));
            catalog.create_idea(&idea).await.unwrap();
            catalog.add_idea_to_group(group.id, idea.id).await.unwrap();
        }
        experiments
            .attach_group(&ExperimentGroup {
                experiment_id: experiment.id,
                group_id: group.id,
                role,
            })
            .await
            .unwrap();
    }

    let service = ParticipationService::new(
        experiments.clone(),
        participations.clone(),
        catalog.clone(),
        Box::new(RngSampler::seeded(seed)),
    );

    Harness {
        experiments,
        participations,
        catalog,
        service,
        identity: Identity { participant: "alice".to_string() },
        experiment_id: experiment.id,
    }
}

impl Harness {
    async fn step(&self) -> StepOutcome {
        self.service
            .current_step(&self.identity, self.experiment_id)
            .await
            .unwrap()
    }

    async fn react(&self, reaction: Reaction) {
        self.service
            .submit_reaction(&self.identity, self.experiment_id, Some(reaction))
            .await
            .unwrap();
    }

    /// Keep reacting until the participation finishes; returns the number of
    /// reactions submitted.
    async fn run_to_completion(&self, reaction: Reaction) -> usize {
        let mut reactions = 0;
        loop {
            match self.step().await {
                StepOutcome::Stimulus { .. } => {
                    self.react(reaction).await;
                    reactions += 1;
                }
                StepOutcome::Finished { .. } => return reactions,
            }
            assert!(reactions <= 100, "state machine failed to terminate");
        }
    }

    async fn entries(&self) -> Vec<ideaflow::domain::models::ResponseEntry> {
        let participation = self
            .participations
            .find(&self.identity.participant, self.experiment_id)
            .await
            .unwrap()
            .unwrap();
        self.participations.list_entries(participation.id).await.unwrap()
    }
}

#[tokio::test]
async fn first_visit_creates_participation_and_draws() {
    let h = harness(3, 3, -1, 0.2, 1).await;

    match h.step().await {
        StepOutcome::Stimulus { participation, entry, idea } => {
            assert_eq!(participation.participant, "alice");
            assert!((participation.expansion_rate - 0.2).abs() < f64::EPSILON);
            assert_eq!(entry.seq, 0);
            assert_eq!(entry.reaction, Reaction::Undefined);
            assert!(!idea.value.is_empty());
        }
        StepOutcome::Finished { .. } => panic!("expected a stimulus on first visit"),
    }
}

#[tokio::test]
async fn redisplay_is_idempotent_until_reaction() {
    let h = harness(3, 3, -1, 0.2, 2).await;

    let first = match h.step().await {
        StepOutcome::Stimulus { entry, .. } => entry,
        StepOutcome::Finished { .. } => panic!("expected a stimulus"),
    };

    // Revisiting without reacting re-displays the same entry and never
    // appends a duplicate.
    for _ in 0..3 {
        match h.step().await {
            StepOutcome::Stimulus { entry, .. } => {
                assert_eq!(entry.id, first.id);
                assert_eq!(entry.idea_id, first.idea_id);
            }
            StepOutcome::Finished { .. } => panic!("expected a stimulus"),
        }
    }

    assert_eq!(h.entries().await.len(), 1);
}

#[tokio::test]
async fn sentinel_reaction_leaves_state_unchanged() {
    // Scenario D
    let h = harness(3, 3, -1, 0.2, 3).await;

    let before = match h.step().await {
        StepOutcome::Stimulus { entry, .. } => entry,
        StepOutcome::Finished { .. } => panic!("expected a stimulus"),
    };

    h.service
        .submit_reaction(&h.identity, h.experiment_id, Some(Reaction::Undefined))
        .await
        .unwrap();
    h.service
        .submit_reaction(&h.identity, h.experiment_id, None)
        .await
        .unwrap();

    match h.step().await {
        StepOutcome::Stimulus { entry, .. } => {
            assert_eq!(entry.id, before.id);
            assert_eq!(entry.reaction, Reaction::Undefined);
        }
        StepOutcome::Finished { .. } => panic!("expected the same stimulus"),
    }
    assert_eq!(h.entries().await.len(), 1);
}

#[tokio::test]
async fn reaction_advances_to_a_fresh_stimulus() {
    let h = harness(3, 3, -1, 0.2, 4).await;

    let first = match h.step().await {
        StepOutcome::Stimulus { entry, .. } => entry,
        StepOutcome::Finished { .. } => panic!("expected a stimulus"),
    };

    h.react(Reaction::Neutral).await;

    match h.step().await {
        StepOutcome::Stimulus { entry, .. } => {
            assert_eq!(entry.seq, 1);
            assert_ne!(entry.idea_id, first.idea_id);
        }
        StepOutcome::Finished { .. } => panic!("expected a second stimulus"),
    }
}

#[tokio::test]
async fn double_submission_only_counts_once() {
    let h = harness(3, 3, -1, 0.2, 5).await;
    let StepOutcome::Stimulus { participation, .. } = h.step().await else {
        panic!("expected a stimulus");
    };
    let starting_rate = participation.expansion_rate;

    // Two POSTs before the next GET (refresh / second tab): the second one
    // lands on an already-answered entry and is ignored.
    h.react(Reaction::Continue).await;
    h.react(Reaction::Continue).await;

    let entries = h.entries().await;
    assert_eq!(entries.len(), 1);

    let updated = h
        .participations
        .find("alice", h.experiment_id)
        .await
        .unwrap()
        .unwrap();
    assert!((updated.expansion_rate - starting_rate).abs() <= 0.05 + 1e-9);
}

#[tokio::test]
async fn scenario_a_small_pools_terminate() {
    // Scenario A: 3/3 pools, no limit. The participation must finish after
    // at most |fixation| + |expansion| reactions.
    let h = harness(3, 3, -1, 0.2, 6).await;
    let reactions = h.run_to_completion(Reaction::Neutral).await;
    assert!(reactions <= 6, "terminated after {reactions} reactions");

    let entries = h.entries().await;

    // Monotonic ordering law: strictly increasing 0-based sequence.
    let seqs: Vec<u32> = entries.iter().map(|e| e.seq).collect();
    let expected: Vec<u32> = (0..entries.len() as u32).collect();
    assert_eq!(seqs, expected);

    // No-repeat law.
    let distinct: HashSet<Uuid> = entries.iter().map(|e| e.idea_id).collect();
    assert_eq!(distinct.len(), entries.len());

    // Terminal state is sticky.
    match h.step().await {
        StepOutcome::Finished { participation } => assert!(participation.finished),
        StepOutcome::Stimulus { .. } => panic!("finished participation drew again"),
    }
    assert_eq!(h.entries().await.len(), entries.len());
}

#[tokio::test]
async fn scenario_b_rate_one_exhausts_expansion_pool() {
    // Scenario B: rate 1.0 forces every draw from the expansion pool; the
    // fixation pool remains unused and the either-pool-empty rule finishes
    // the participation once expansion runs dry.
    let h = harness(4, 3, -1, 1.0, 7).await;
    let reactions = h.run_to_completion(Reaction::Neutral).await;
    assert_eq!(reactions, 3);

    let entries = h.entries().await;
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.did_expand));

    let participation = h
        .participations
        .find("alice", h.experiment_id)
        .await
        .unwrap()
        .unwrap();
    assert!(participation.finished);
}

#[tokio::test]
async fn scenario_c_response_limit_caps_the_run() {
    // Scenario C: limit 2 with large pools finishes after exactly 2 entries.
    let h = harness(10, 10, 2, 0.5, 8).await;
    let reactions = h.run_to_completion(Reaction::Neutral).await;
    assert_eq!(reactions, 2);
    assert_eq!(h.entries().await.len(), 2);
}

#[tokio::test]
async fn reactions_adjust_the_rate_with_clamping() {
    // Rate 1.0 guarantees the first draw expands, making the adjustment
    // direction deterministic.
    let h = harness(3, 3, -1, 1.0, 9).await;
    let StepOutcome::Stimulus { entry, .. } = h.step().await else {
        panic!("expected a stimulus");
    };
    assert!(entry.did_expand);

    // continue after an expansion draw raises, but 1.0 is already the cap
    h.react(Reaction::Continue).await;
    let p = h.participations.find("alice", h.experiment_id).await.unwrap().unwrap();
    assert!((p.expansion_rate - 1.0).abs() < f64::EPSILON);

    let StepOutcome::Stimulus { entry, .. } = h.step().await else {
        panic!("expected a stimulus");
    };
    assert!(entry.did_expand);

    // expand after an expansion draw lowers by one step
    h.react(Reaction::Expand).await;
    let p = h.participations.find("alice", h.experiment_id).await.unwrap().unwrap();
    assert!((p.expansion_rate - 0.95).abs() < 1e-9);

    // the answered entry records the post-reaction rate
    let entries = h.entries().await;
    assert!((entries[1].expansion_rate - 0.95).abs() < 1e-9);
    assert_eq!(entries[1].reaction, Reaction::Expand);
}

#[tokio::test]
async fn unknown_experiment_is_not_found() {
    let h = harness(1, 1, -1, 0.2, 10).await;
    let err = h
        .service
        .current_step(&h.identity, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ideaflow::DomainError::ExperimentNotFound(_)));
}

#[tokio::test]
async fn stopped_experiment_rejects_participants() {
    let h = harness(1, 1, -1, 0.2, 11).await;

    let mut experiment = h.experiments.get(h.experiment_id).await.unwrap().unwrap();
    experiment.running = false;
    h.experiments.update(&experiment).await.unwrap();

    let err = h.service.current_step(&h.identity, h.experiment_id).await.unwrap_err();
    assert!(matches!(err, ideaflow::DomainError::ExperimentNotRunning(_)));
}

#[tokio::test]
async fn concurrent_visits_draw_a_single_stimulus() {
    let h = harness(5, 5, -1, 0.5, 12).await;

    let (a, b) = tokio::join!(
        h.service.current_step(&h.identity, h.experiment_id),
        h.service.current_step(&h.identity, h.experiment_id),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let (StepOutcome::Stimulus { entry: ea, .. }, StepOutcome::Stimulus { entry: eb, .. }) = (a, b)
    else {
        panic!("expected stimuli from both requests");
    };

    // per-participation serialization: the second request re-displayed
    // rather than drawing a second entry
    assert_eq!(ea.id, eb.id);
    assert_eq!(h.entries().await.len(), 1);
}

#[tokio::test]
async fn participants_are_isolated() {
    let h = harness(3, 3, -1, 0.2, 13).await;
    let bob = Identity { participant: "bob".to_string() };

    let StepOutcome::Stimulus { entry: alice_entry, .. } = h.step().await else {
        panic!("expected a stimulus");
    };
    let StepOutcome::Stimulus { entry: bob_entry, .. } =
        h.service.current_step(&bob, h.experiment_id).await.unwrap()
    else {
        panic!("expected a stimulus");
    };

    assert_ne!(alice_entry.participation_id, bob_entry.participation_id);
    assert_eq!(bob_entry.seq, 0);
}

#[tokio::test]
async fn results_are_gated_by_ownership() {
    let h = harness(2, 2, -1, 0.2, 14).await;

    let mut experiment = h.experiments.get(h.experiment_id).await.unwrap().unwrap();
    experiment.owner = Some("carol".to_string());
    h.experiments.update(&experiment).await.unwrap();

    h.run_to_completion(Reaction::Neutral).await;

    let service = ExperimentService::new(
        h.experiments.clone(),
        h.participations.clone(),
        h.catalog.clone(),
    );

    let owner = Identity { participant: "carol".to_string() };
    let results = service.results(h.experiment_id, Some(&owner)).await.unwrap();
    assert_eq!(results.participations.len(), 1);
    assert!(results.participations[0].participation.finished);
    assert!(results.participations[0]
        .rows
        .iter()
        .all(|row| !row.idea_value.is_empty()));

    let stranger = Identity { participant: "mallory".to_string() };
    let err = service.results(h.experiment_id, Some(&stranger)).await.unwrap_err();
    assert!(matches!(err, ideaflow::DomainError::NotAuthorized(_)));

    // the CLI path passes no requester and bypasses the gate
    assert!(service.results(h.experiment_id, None).await.is_ok());
}
