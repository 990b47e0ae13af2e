//! シミュレーターの性質テスト

use std::sync::Arc;

use viralstage::simulator::clock::ManualClock;
use viralstage::simulator::phrase_bank::phrases;
use viralstage::simulator::{
    CommentFeedGenerator, CommentMode, ReactionScheduler, SharedClock, ViewerCountSimulator,
    ViewerTier, COMMENT_LOG_CAPACITY, MAX_ACTIVE_REACTIONS,
};

fn manual_clock() -> (Arc<ManualClock>, SharedClock) {
    let clock = Arc::new(ManualClock::default());
    let shared: SharedClock = clock.clone();
    (clock, shared)
}

#[test]
fn viewer_count_stays_within_tier_for_every_tick() {
    for (seed, tier) in ViewerTier::ALL.into_iter().enumerate() {
        let bounds = tier.config();
        let mut simulator = ViewerCountSimulator::with_seed(seed as u64 + 100);
        let initial = simulator.activate(tier);
        assert!(bounds.contains(initial), "{:?} initial {}", tier, initial);

        for _ in 0..5_000 {
            let count = simulator.tick().expect("active simulator ticks");
            assert!(
                bounds.min_count <= count && count <= bounds.max_count,
                "{:?} produced {}",
                tier,
                count
            );
        }
    }
}

#[test]
fn perturbation_past_the_ceiling_sticks_to_the_bound() {
    let mut simulator = ViewerCountSimulator::with_seed(1);
    simulator.activate(ViewerTier::Low);
    simulator.set_current_count(14_500);

    assert_eq!(simulator.apply_perturbation(1_000), Some(15_000));
    assert_eq!(simulator.apply_perturbation(1_000), Some(15_000));
    assert_eq!(simulator.apply_perturbation(-1_000), Some(14_000));
}

#[test]
fn unknown_tier_key_falls_back_to_medium() {
    assert_eq!(ViewerTier::resolve("EXTREME"), ViewerTier::Medium);
    assert_eq!(ViewerTier::resolve("low"), ViewerTier::Low);
}

#[test]
fn comment_log_evicts_the_earliest_entry_on_the_twenty_first_insert() {
    let (clock, shared) = manual_clock();
    let mut feed = CommentFeedGenerator::with_seed(5, shared);
    feed.activate(CommentMode::Fanboy);

    let mut inserted = Vec::new();
    for _ in 0..COMMENT_LOG_CAPACITY {
        inserted.push(feed.tick().expect("comment"));
        clock.advance(std::time::Duration::from_millis(2000));
    }
    assert_eq!(feed.log().len(), 20);

    let earliest = inserted
        .iter()
        .min_by_key(|c| c.created_at)
        .expect("non-empty")
        .id;
    let newest = feed.tick().expect("21st comment");

    assert_eq!(feed.log().len(), 20);
    assert!(!feed.log().contains(earliest));
    assert!(feed.log().contains(newest.id));
    assert_eq!(feed.log().scroll_anchor(), Some(newest.id));
}

#[test]
fn troll_mode_only_draws_troll_phrases() {
    let (_clock, shared) = manual_clock();
    let mut feed = CommentFeedGenerator::with_seed(11, shared);
    feed.activate(CommentMode::Troll);

    let bank = phrases(CommentMode::Troll);
    for _ in 0..200 {
        let comment = feed.tick().expect("comment");
        assert!(bank.contains(&comment.text.as_str()), "{}", comment.text);
    }
}

#[test]
fn unrecognized_mode_falls_back_to_fanboy_bank() {
    let (_clock, shared) = manual_clock();
    let mut feed = CommentFeedGenerator::with_seed(12, shared);
    feed.activate(CommentMode::resolve("sarcastic"));

    let bank = phrases(CommentMode::Fanboy);
    for _ in 0..100 {
        let comment = feed.tick().expect("comment");
        assert_eq!(comment.mode, CommentMode::Fanboy);
        assert!(bank.contains(&comment.text.as_str()));
    }
}

#[test]
fn mode_change_only_affects_later_comments() {
    let (_clock, shared) = manual_clock();
    let mut feed = CommentFeedGenerator::with_seed(13, shared);
    feed.activate(CommentMode::Romantic);
    let before = feed.tick().expect("comment");

    feed.set_mode(CommentMode::Multilingual);
    let after = feed.tick().expect("comment");

    let kept = feed
        .log()
        .iter()
        .find(|c| c.id == before.id)
        .expect("history kept");
    assert_eq!(kept.mode, CommentMode::Romantic);
    assert!(phrases(CommentMode::Romantic).contains(&kept.text.as_str()));
    assert!(phrases(CommentMode::Multilingual).contains(&after.text.as_str()));
}

#[test]
fn particle_set_is_capped_and_removal_is_idempotent() {
    let (_clock, shared) = manual_clock();
    let mut scheduler = ReactionScheduler::with_seed(21, shared);
    scheduler.activate();

    let mut spawned = Vec::new();
    for _ in 0..25 {
        let outcome = scheduler.tick().expect("spawn");
        assert!(scheduler.len() <= MAX_ACTIVE_REACTIONS);
        spawned.push(outcome.particle.id);
    }
    assert_eq!(scheduler.len(), MAX_ACTIVE_REACTIONS);

    let evicted = spawned[0];
    assert!(!scheduler.contains(evicted));
    assert!(!scheduler.remove(evicted));

    let live = spawned[24];
    assert!(scheduler.complete(live));
    let len_after_first = scheduler.len();
    assert!(!scheduler.remove(live));
    assert_eq!(scheduler.len(), len_after_first);
}

#[test]
fn deactivated_generators_produce_nothing() {
    let (_clock, shared) = manual_clock();
    let mut feed = CommentFeedGenerator::with_seed(1, shared.clone());
    let mut scheduler = ReactionScheduler::with_seed(2, shared);
    let mut viewers = ViewerCountSimulator::with_seed(3);

    feed.activate(CommentMode::Fanboy);
    scheduler.activate();
    viewers.activate(ViewerTier::High);

    feed.deactivate();
    scheduler.deactivate();
    viewers.deactivate();

    assert!(feed.tick().is_none());
    assert!(feed.append_text("late", CommentMode::Fanboy).is_none());
    assert!(scheduler.tick().is_none());
    assert!(viewers.tick().is_none());
}
