use domain::{DataPoint, FieldIndex, FieldValues, Location};
use feedhub_storage::{
    ChannelCounter, ChannelRecord, ChannelStore, FeedCommit, FeedStore, InMemoryFeedStore,
    RuleRecord, RuleStateRecord, StorageErrorKind,
};

fn sample_feed(channel_id: i64, entry_id: i64, field1: f64) -> DataPoint {
    DataPoint {
        channel_id,
        entry_id,
        created_at_ms: 1_000 * entry_id,
        fields: FieldValues::default().with(FieldIndex::ALL[0], Some(field1)),
        location: Location::default(),
        status: None,
    }
}

fn store_with_channel(channel_id: i64) -> InMemoryFeedStore {
    let store = InMemoryFeedStore::new();
    store
        .insert_channel(ChannelRecord::new(channel_id, "channel"))
        .expect("channel");
    store
}

#[tokio::test]
async fn rules_listed_by_priority_then_id() {
    let store = store_with_channel(5);
    for (rule_id, priority, active) in [(3, 1, true), (1, 2, true), (2, 1, true), (4, 0, false)] {
        store
            .insert_rule(RuleRecord {
                rule_id,
                channel_id: 5,
                priority,
                is_active: active,
                ..RuleRecord::default()
            })
            .expect("rule");
    }
    store
        .insert_rule(RuleRecord {
            rule_id: 9,
            channel_id: 6,
            ..RuleRecord::default()
        })
        .expect("other channel rule");

    let rules = store.list_active_rules(5).await.expect("rules");
    let ids: Vec<i64> = rules.iter().map(|rule| rule.rule_id).collect();
    assert_eq!(ids, vec![2, 3, 1]);
}

#[tokio::test]
async fn commit_applies_feeds_counters_and_rule_state() {
    let store = store_with_channel(5);
    store
        .insert_rule(RuleRecord {
            rule_id: 7,
            channel_id: 5,
            rule_type: "pid".to_string(),
            ..RuleRecord::default()
        })
        .expect("rule");

    let commit = FeedCommit {
        feeds: vec![sample_feed(5, 1, 1.0), sample_feed(5, 2, 2.0)],
        channels: vec![ChannelCounter {
            channel_id: 5,
            last_entry_id: 2,
        }],
        rule_states: vec![RuleStateRecord {
            rule_id: 7,
            pid_integral: 4.5,
            pid_last_error: 1.5,
        }],
    };
    let written = store.commit_feeds(&commit).await.expect("commit");
    assert_eq!(written, 2);

    let channel = store.find_channel(5).await.expect("find").expect("channel");
    assert_eq!(channel.last_entry_id, 2);
    let rule = store.rule(7).expect("rule");
    assert_eq!(rule.pid_integral, 4.5);
    assert_eq!(rule.pid_last_error, 1.5);

    let last = store.last_feed(5).await.expect("last").expect("feed");
    assert_eq!(last.entry_id, 2);

    let newest_first = store.list_feeds(5, 10).await.expect("list");
    assert_eq!(
        newest_first.iter().map(|f| f.entry_id).collect::<Vec<_>>(),
        vec![2, 1]
    );
    assert_eq!(store.list_feeds(5, 1).await.expect("list").len(), 1);
}

#[tokio::test]
async fn rejected_entry_rolls_back_whole_commit() {
    let store = store_with_channel(5);
    store.reject_entry(5, 3);

    let commit = FeedCommit {
        feeds: (1..=5).map(|entry| sample_feed(5, entry, entry as f64)).collect(),
        channels: vec![ChannelCounter {
            channel_id: 5,
            last_entry_id: 5,
        }],
        rule_states: Vec::new(),
    };
    store.commit_feeds(&commit).await.expect_err("rejected");

    assert!(store.is_empty());
    assert_eq!(store.channel(5).expect("channel").last_entry_id, 0);
}

#[tokio::test]
async fn commit_rejects_entry_id_regression() {
    let store = store_with_channel(5);
    store
        .commit_feeds(&FeedCommit {
            feeds: vec![sample_feed(5, 1, 1.0)],
            ..FeedCommit::default()
        })
        .await
        .expect("first");

    let err = store
        .commit_feeds(&FeedCommit {
            feeds: vec![sample_feed(5, 1, 2.0)],
            ..FeedCommit::default()
        })
        .await
        .expect_err("duplicate entry id");
    assert_eq!(err.kind(), StorageErrorKind::Conflict);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn commit_rejects_unknown_channel() {
    let store = store_with_channel(5);
    let err = store
        .commit_feeds(&FeedCommit {
            feeds: vec![sample_feed(5, 1, 1.0), sample_feed(6, 1, 1.0)],
            ..FeedCommit::default()
        })
        .await
        .expect_err("unknown channel");
    assert_eq!(err.to_string(), "channel 6 not found");
    assert!(store.is_empty());
}

#[tokio::test]
async fn commit_rejects_unknown_rule_state() {
    let store = store_with_channel(5);
    let err = store
        .commit_feeds(&FeedCommit {
            feeds: vec![sample_feed(5, 1, 1.0)],
            channels: vec![ChannelCounter {
                channel_id: 5,
                last_entry_id: 1,
            }],
            rule_states: vec![RuleStateRecord {
                rule_id: 42,
                pid_integral: 1.0,
                pid_last_error: 1.0,
            }],
        })
        .await
        .expect_err("unknown rule");
    assert_eq!(err.kind(), StorageErrorKind::Conflict);
    assert_eq!(err.to_string(), "rule 42 not found");
    assert!(store.is_empty());
    assert_eq!(store.channel(5).expect("channel").last_entry_id, 0);
}
