use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use newzlm::editorial::records::format_published_date;
use newzlm::editorial::EditorialDesk;
use newzlm::store::{FileStore, KeyValueStore, MemoryStore, SqliteStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

/// One desk per storage adapter; the TempDir keeps file-backed stores alive.
async fn desks() -> Vec<(&'static str, EditorialDesk, TempDir)> {
    let mut out = Vec::new();

    let dir = tempfile::tempdir().expect("tempdir");
    out.push(("memory", EditorialDesk::new(Arc::new(MemoryStore::new())), dir));

    let dir = tempfile::tempdir().expect("tempdir");
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path().join("newzlm.json")));
    out.push(("file", EditorialDesk::new(store), dir));

    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("newzlm.db");
    let store = SqliteStore::connect(db_path.to_str().expect("utf-8 path"))
        .await
        .expect("sqlite store");
    out.push(("sqlite", EditorialDesk::new(Arc::new(store)), dir));

    out
}

async fn ids(desk: &EditorialDesk) -> (HashSet<String>, HashSet<String>, HashSet<String>) {
    let drafts = desk.list_drafts().await.into_iter().map(|d| d.id).collect();
    let submitted = desk.list_submitted().await.into_iter().map(|s| s.id).collect();
    let published = desk.list_published().await.into_iter().map(|p| p.id).collect();
    (drafts, submitted, published)
}

/// Memory store whose reads of one key can be made to fail, like a locked database.
#[derive(Default)]
struct FailingReads {
    inner: MemoryStore,
    failing: Mutex<Option<&'static str>>,
}

impl FailingReads {
    fn fail_reads_of(&self, key: Option<&'static str>) {
        *self.failing.lock().unwrap() = key;
    }
}

#[async_trait::async_trait]
impl KeyValueStore for FailingReads {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if *self.failing.lock().unwrap() == Some(key) {
            return Err(anyhow!("database is locked"));
        }
        self.inner.get(key).await
    }

    async fn set_many(&self, entries: Vec<(String, String)>) -> Result<()> {
        self.inner.set_many(entries).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key).await
    }
}

#[tokio::test]
async fn kazakh_tech_scenario_on_every_adapter() {
    for (name, desk, _dir) in desks().await {
        assert!(desk.list_drafts().await.is_empty(), "{}", name);

        let draft = desk.save_draft(None, "Kazakh Tech", "body").await.unwrap();
        let drafts = desk.list_drafts().await;
        assert_eq!(drafts.len(), 1, "{}", name);
        assert_eq!(drafts[0].title, "Kazakh Tech");
        assert!(!draft.id.is_empty());

        desk.submit(&draft.id).await.unwrap().expect("submitted");
        assert!(desk.list_drafts().await.is_empty(), "{}", name);
        let submitted = desk.list_submitted().await;
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].id, draft.id);
        assert_eq!(submitted[0].title, "Kazakh Tech");

        desk.approve(&draft.id).await.unwrap().expect("approved");
        assert!(desk.list_submitted().await.is_empty(), "{}", name);
        let published = desk.list_published().await;
        let record = &published[0];
        assert_eq!(record.id, draft.id);
        assert_eq!(record.title, "Kazakh Tech");
        assert_eq!(record.views, "0");
        assert_eq!(record.published_at, format_published_date(chrono::Utc::now()));
        // the two seed entries follow the new one
        assert_eq!(published.len(), 3, "{}", name);
    }
}

#[tokio::test]
async fn submit_then_reject_restores_the_draft() {
    for (name, desk, _dir) in desks().await {
        let draft = desk.save_draft(None, "Aral Sea", "Water levels").await.unwrap();
        desk.submit(&draft.id).await.unwrap().expect("submitted");

        let restored = desk.reject(&draft.id).await.unwrap().expect("rejected");
        assert_eq!(restored.id, draft.id, "{}", name);
        assert_eq!(restored.title, "Aral Sea");
        assert_eq!(restored.content, "Water levels");
        assert!(restored.updated_at >= draft.updated_at);

        assert!(desk.list_submitted().await.is_empty());
        assert_eq!(desk.list_drafts().await, vec![restored]);
    }
}

#[tokio::test]
async fn submit_then_approve_publishes_exactly_once() {
    for (name, desk, _dir) in desks().await {
        let before = desk.list_published().await.len();
        let draft = desk.save_draft(None, "Silk Road", "Trade").await.unwrap();
        desk.submit(&draft.id).await.unwrap();
        desk.approve(&draft.id).await.unwrap();

        let published = desk.list_published().await;
        assert_eq!(published.len(), before + 1, "{}", name);
        let matching: Vec<_> = published.iter().filter(|p| p.id == draft.id).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].views, "0");
        assert!(desk.get_submitted(&draft.id).await.is_none());
    }
}

#[tokio::test]
async fn save_without_id_twice_creates_two_drafts() {
    for (name, desk, _dir) in desks().await {
        let a = desk.save_draft(None, "T", "C").await.unwrap();
        let b = desk.save_draft(None, "T", "C").await.unwrap();
        assert_ne!(a.id, b.id, "{}", name);
        assert_eq!(desk.list_drafts().await.len(), 2);

        let updated = desk.save_draft(Some(&a.id), "T", "C2").await.unwrap();
        assert_eq!(updated.id, a.id);
        let drafts = desk.list_drafts().await;
        assert_eq!(drafts.len(), 2, "{}", name);
        // overwritten in place, load order kept
        assert_eq!(drafts[0].id, a.id);
        assert_eq!(drafts[0].content, "C2");
    }
}

#[tokio::test]
async fn misses_leave_collections_unchanged() {
    for (name, desk, _dir) in desks().await {
        let kept = desk.save_draft(None, "Keep", "me").await.unwrap();
        let queued = desk.save_and_submit(None, "Queued", "text").await.unwrap();
        let before = ids(&desk).await;
        let drafts_before = desk.list_drafts().await;

        assert!(!desk.delete_draft("missing").await.unwrap(), "{}", name);
        assert_eq!(desk.list_drafts().await, drafts_before);

        assert!(desk.approve("missing").await.unwrap().is_none());
        assert!(desk.reject("missing").await.unwrap().is_none());
        // a draft id is not a submission id
        assert!(desk.approve(&kept.id).await.unwrap().is_none());
        assert!(desk.submit(&queued.id).await.unwrap().is_none());

        assert_eq!(ids(&desk).await, before, "{}", name);
    }
}

#[tokio::test]
async fn random_operation_sequences_keep_ids_in_one_collection() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for (name, desk, _dir) in desks().await {
        let mut known: Vec<String> = Vec::new();

        for step in 0..120 {
            let pick = |rng: &mut StdRng, known: &[String]| -> String {
                if known.is_empty() || rng.gen_bool(0.1) {
                    "missing".to_string()
                } else {
                    known[rng.gen_range(0..known.len())].clone()
                }
            };

            match rng.gen_range(0..6) {
                0 => {
                    let draft = desk
                        .save_draft(None, &format!("Story {}", step), "body")
                        .await
                        .unwrap();
                    known.push(draft.id);
                }
                1 => {
                    let id = pick(&mut rng, &known);
                    desk.save_draft(Some(&id), "Edited", "new body").await.unwrap();
                }
                2 => {
                    desk.submit(&pick(&mut rng, &known)).await.unwrap();
                }
                3 => {
                    desk.approve(&pick(&mut rng, &known)).await.unwrap();
                }
                4 => {
                    desk.reject(&pick(&mut rng, &known)).await.unwrap();
                }
                _ => {
                    desk.delete_draft(&pick(&mut rng, &known)).await.unwrap();
                }
            }

            let (drafts, submitted, published) = ids(&desk).await;
            assert!(drafts.is_disjoint(&submitted), "{} step {}", name, step);
            assert!(drafts.is_disjoint(&published), "{} step {}", name, step);
            assert!(submitted.is_disjoint(&published), "{} step {}", name, step);

            // no duplicate ids inside a collection either
            assert_eq!(drafts.len(), desk.list_drafts().await.len());
            assert_eq!(submitted.len(), desk.list_submitted().await.len());
        }
    }
}

#[tokio::test]
async fn concurrent_saves_are_all_kept() {
    let desk = Arc::new(EditorialDesk::new(Arc::new(MemoryStore::new())));

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let desk = desk.clone();
            tokio::spawn(async move { desk.save_draft(None, &format!("Draft {}", i), "x").await })
        })
        .collect();

    for handle in handles {
        handle.await.expect("join").expect("save");
    }

    assert_eq!(desk.list_drafts().await.len(), 20);
}

#[tokio::test]
async fn collections_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("newzlm.json");

    let draft_id = {
        let desk = EditorialDesk::new(Arc::new(FileStore::new(&path)));
        let draft = desk.save_draft(None, "Persisted", "body").await.unwrap();
        desk.save_and_submit(None, "Queued", "text").await.unwrap();
        draft.id
    };

    let desk = EditorialDesk::new(Arc::new(FileStore::new(&path)));
    assert_eq!(desk.get_draft(&draft_id).await.unwrap().title, "Persisted");
    assert_eq!(desk.list_submitted().await[0].title, "Queued");
    assert_eq!(
        desk.dashboard().await,
        newzlm::editorial::Dashboard {
            drafts: 1,
            submitted: 1,
            published: 2
        }
    );
}

#[tokio::test]
async fn unreadable_drafts_abort_transitions_without_writing() {
    let store = Arc::new(FailingReads::default());
    let desk = EditorialDesk::new(store.clone());

    let keep = desk.save_draft(None, "Keep", "body").await.unwrap();
    let queued = desk.save_and_submit(None, "Queued", "text").await.unwrap();

    store.fail_reads_of(Some("newzlm_drafts"));
    assert!(desk.reject(&queued.id).await.is_err());
    assert!(desk.save_draft(None, "Other", "").await.is_err());
    assert!(desk.delete_draft(&keep.id).await.is_err());
    assert!(desk.submit(&keep.id).await.is_err());
    assert!(desk.save_and_submit(Some(&keep.id), "Keep", "edited").await.is_err());
    // read-only views still answer
    assert!(desk.list_drafts().await.is_empty());
    store.fail_reads_of(None);

    let drafts = desk.list_drafts().await;
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].title, "Keep");
    assert_eq!(drafts[0].content, "body");
    let submitted: Vec<String> = desk.list_submitted().await.into_iter().map(|s| s.id).collect();
    assert_eq!(submitted, [queued.id.clone()]);

    // the same reject goes through once the store recovers
    desk.reject(&queued.id).await.unwrap().expect("still queued");
    assert_eq!(desk.list_drafts().await.len(), 2);
}

#[tokio::test]
async fn unreadable_published_list_keeps_earlier_approvals() {
    let store = Arc::new(FailingReads::default());
    let desk = EditorialDesk::new(store.clone());

    let a = desk.save_and_submit(None, "A", "").await.unwrap();
    desk.approve(&a.id).await.unwrap().expect("A queued");
    let b = desk.save_and_submit(None, "B", "").await.unwrap();

    store.fail_reads_of(Some("newzlm_published"));
    assert!(desk.approve(&b.id).await.is_err());
    store.fail_reads_of(None);

    let titles: Vec<String> = desk.list_published().await.into_iter().map(|p| p.title).collect();
    assert_eq!(titles.len(), 3);
    assert_eq!(titles[0], "A");
    assert!(desk.get_submitted(&b.id).await.is_some());

    desk.approve(&b.id).await.unwrap().expect("B still queued");
    let titles: Vec<String> = desk.list_published().await.into_iter().map(|p| p.title).collect();
    assert_eq!(titles.len(), 4);
    assert_eq!(&titles[..2], ["B", "A"]);
}

#[tokio::test]
async fn unreadable_submissions_abort_submit() {
    let store = Arc::new(FailingReads::default());
    let desk = EditorialDesk::new(store.clone());

    let waiting = desk.save_and_submit(None, "Waiting", "").await.unwrap();
    let draft = desk.save_draft(None, "Next", "").await.unwrap();

    store.fail_reads_of(Some("newzlm_submitted"));
    assert!(desk.submit(&draft.id).await.is_err());
    assert!(desk.approve(&waiting.id).await.is_err());
    store.fail_reads_of(None);

    assert_eq!(desk.get_draft(&draft.id).await.unwrap().title, "Next");
    let submitted: Vec<String> = desk.list_submitted().await.into_iter().map(|s| s.id).collect();
    assert_eq!(submitted, [waiting.id]);
}
