//! Repository scenarios against the in-memory store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use docrepo::memory::MemoryClient;
use docrepo::{
    and, new_query, or, CancellationToken, ClientHandle, ClientSettings, Entity, EntityId,
    Predicate, Projection, Repository, Sort, StoreError, UpdateSpec,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Lead {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<EntityId>,
    company_id: String,
    agent_id: String,
    name: String,
    score: i64,
}

impl Entity for Lead {}

impl Lead {
    fn new(company_id: &str, agent_id: &str, name: &str, score: i64) -> Self {
        Self {
            id: None,
            company_id: company_id.to_string(),
            agent_id: agent_id.to_string(),
            name: name.to_string(),
            score,
        }
    }
}

#[derive(Debug, PartialEq, Deserialize)]
struct LeadName {
    name: String,
}

/// Repository over a fresh, uniquely named memory server.
fn repository() -> Repository<Lead> {
    common::telemetry::init_test_tracing();
    let url = format!("memory://repo-{}", Uuid::new_v4());
    let client = MemoryClient::connect(ClientSettings::new(url)).unwrap();
    let handle = ClientHandle::with_client(Arc::new(client));
    Repository::new(&handle, "crm").unwrap()
}

fn company(id: &str) -> Predicate<Lead> {
    let id = id.to_string();
    Predicate::new(move |it| it.field("company_id").eq(id))
}

fn agent(id: &str) -> Predicate<Lead> {
    let id = id.to_string();
    Predicate::new(move |it| it.field("agent_id").eq(id))
}

fn with_id(id: EntityId) -> Predicate<Lead> {
    Predicate::new(move |it| it.id_field().eq(id))
}

async fn seed(repo: &Repository<Lead>) -> Vec<EntityId> {
    let leads = vec![
        Lead::new("C1", "A1", "ada", 40),
        Lead::new("C1", "A2", "grace", 75),
        Lead::new("C1", "A1", "linus", 12),
        Lead::new("C2", "A1", "barbara", 90),
        Lead::new("C2", "A3", "ken", 55),
    ];
    repo.add_range(&leads, None).await.unwrap()
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_company_and_agent_counts() {
    let repo = repository();

    let leads: Vec<Lead> = (0..100_000)
        .map(|n| {
            let agent_id = if n % 100 == 0 { "A1" } else { "A0" };
            Lead::new("C1", agent_id, &format!("lead-{}", n), n)
        })
        .collect();
    let ids = repo.add_range(&leads, None).await.unwrap();
    assert_eq!(ids.len(), 100_000);

    let in_company = new_query(company("C1"));
    assert_eq!(repo.count(Some(&in_company), None).await.unwrap(), 100_000);

    let with_agent = in_company.and(&agent("A1"));
    assert_eq!(repo.count(Some(&with_agent), None).await.unwrap(), 1_000);

    // narrowing left the base predicate untouched
    assert_eq!(repo.count(Some(&in_company), None).await.unwrap(), 100_000);
}

#[tokio::test]
async fn test_delete_by_ids_reports_exact_count() {
    let repo = repository();
    let leads: Vec<Lead> = (0..5_000)
        .map(|n| Lead::new("C1", "A1", &format!("lead-{}", n), n))
        .collect();
    let ids = repo.add_range(&leads, None).await.unwrap();

    let doomed: Vec<String> = ids.iter().step_by(4).take(750).map(|id| id.to_hex()).collect();
    assert_eq!(doomed.len(), 750);
    let filter = Predicate::<Lead>::new(move |it| it.id_field().is_in(doomed));

    let before = repo.count(None, None).await.unwrap();
    let outcome = repo.execute_delete(&filter, None).await.unwrap();
    let after = repo.count(None, None).await.unwrap();

    assert_eq!(outcome.deleted_count, 750);
    assert_eq!(before - after, 750);
}

#[tokio::test]
async fn test_update_preserves_identity() {
    let repo = repository();
    let ids = seed(&repo).await;
    let target = ids[1];

    let replacement = Lead::new("C1", "A9", "grace hopper", 80);
    let outcome = repo
        .update(&with_id(target), &replacement, None)
        .await
        .unwrap();
    assert!(outcome.found());
    assert_eq!(outcome.modified_count, 1);

    let by_name = Predicate::new(|it| it.field("name").eq("grace hopper"));
    let stored = repo.get(&by_name, None, None).await.unwrap().unwrap();

    assert_eq!(stored.id, Some(target));
    assert_eq!(stored.agent_id, "A9");
    assert_eq!(repo.count(None, None).await.unwrap(), ids.len() as u64);
}

#[tokio::test]
async fn test_update_without_match_changes_nothing() {
    let repo = repository();
    seed(&repo).await;

    let outcome = repo
        .update(&company("C9"), &Lead::new("C9", "A1", "nobody", 0), None)
        .await
        .unwrap();

    assert!(!outcome.found());
    assert_eq!(repo.count(Some(&company("C9")), None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_insert_then_get_round_trips() {
    let repo = repository();
    let lead = Lead::new("C7", "A7", "margaret", 64);

    let id = repo.add(&lead, None).await.unwrap();
    let stored = repo.get(&with_id(id), None, None).await.unwrap().unwrap();

    assert_eq!(stored, Lead { id: Some(id), ..lead });
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn test_count_equals_get_all_len() {
    let repo = repository();
    seed(&repo).await;

    let filters = [
        None,
        Some(company("C1")),
        Some(agent("A1")),
        and(Some(&company("C2")), Some(&agent("A3"))),
        Some(Predicate::new(|it| it.field("score").gt(1_000))),
    ];

    for filter in &filters {
        let count = repo.count(filter.as_ref(), None).await.unwrap();
        let all = repo.get_all(filter.as_ref(), None, None).await.unwrap();
        assert_eq!(count, all.len() as u64);
    }
}

#[tokio::test]
async fn test_get_all_sorted() {
    let repo = repository();
    seed(&repo).await;

    let names: Vec<String> = repo
        .get_all(Some(&company("C1")), Some(&Sort::descending("score")), None)
        .await
        .unwrap()
        .into_iter()
        .map(|lead| lead.name)
        .collect();

    assert_eq!(names, vec!["grace", "ada", "linus"]);
}

#[tokio::test]
async fn test_get_uses_sort_to_pick_first() {
    let repo = repository();
    seed(&repo).await;

    let lowest = repo
        .get(&company("C1"), Some(&Sort::ascending("score")), None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(lowest.name, "linus");
}

#[tokio::test]
async fn test_pages_cover_every_match() {
    let repo = repository();
    let leads: Vec<Lead> = (0..23)
        .map(|n| Lead::new("C1", "A1", &format!("lead-{}", n), n))
        .collect();
    repo.add_range(&leads, None).await.unwrap();
    let filter = company("C1");
    let sort = Sort::ascending("score");

    let first = repo
        .get_page(0, 5, Some(&filter), Some(&sort), None)
        .await
        .unwrap();
    assert_eq!(first.count, 23);
    assert_eq!(first.pages, 5);

    let mut seen = Vec::new();
    for page in 0..first.pages {
        let slice = repo
            .get_page(page, 5, Some(&filter), Some(&sort), None)
            .await
            .unwrap();
        seen.extend(slice.items.into_iter().map(|lead| lead.score));
    }

    assert_eq!(seen.len() as u64, first.count);
    assert_eq!(seen, (0..23).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_select_projects_into_other_shape() {
    let repo = repository();
    seed(&repo).await;
    let projection = Projection::new(["name"]).exclude_id();

    let names: Vec<LeadName> = repo
        .select_all(&projection, Some(&agent("A1")), None)
        .await
        .unwrap();
    assert_eq!(names.len(), 3);

    let one: Option<LeadName> = repo
        .select(&projection, Some(&agent("A3")), None)
        .await
        .unwrap();
    assert_eq!(one, Some(LeadName { name: "ken".to_string() }));

    let none: Option<LeadName> = repo
        .select(&projection, Some(&agent("A404")), None)
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn test_any_and_extremes() {
    let repo = repository();
    assert_eq!(repo.max::<i64>("score", None).await.unwrap(), None);

    seed(&repo).await;

    assert!(repo.any(&company("C2"), None).await.unwrap());
    assert!(!repo.any(&company("C3"), None).await.unwrap());
    assert_eq!(repo.max::<i64>("score", None).await.unwrap(), Some(90));
    assert_eq!(repo.min::<i64>("score", None).await.unwrap(), Some(12));
    assert_eq!(repo.min::<String>("name", None).await.unwrap(), Some("ada".to_string()));
}

#[tokio::test]
async fn test_or_widens_filter() {
    let repo = repository();
    seed(&repo).await;

    let high = Predicate::<Lead>::new(|it| it.field("score").gte(75));
    let widened = or(Some(&company("C2")), Some(&high)).unwrap();

    assert_eq!(repo.count(Some(&widened), None).await.unwrap(), 3);
}

// =============================================================================
// Writes
// =============================================================================

#[tokio::test]
async fn test_execute_update_touches_every_match() {
    let repo = repository();
    seed(&repo).await;

    let outcome = repo
        .execute_update(
            Some(&agent("A1")),
            &UpdateSpec::new().set("agent_id", "A5").inc("score", 1),
            None,
        )
        .await
        .unwrap();

    assert_eq!(outcome.matched_count, 3);
    assert_eq!(outcome.modified_count, 3);
    assert_eq!(repo.count(Some(&agent("A5")), None).await.unwrap(), 3);
    assert_eq!(repo.max::<i64>("score", None).await.unwrap(), Some(91));
}

#[tokio::test]
async fn test_refresh_replaces_matching_set() {
    let repo = repository();
    seed(&repo).await;

    let replacements = vec![
        Lead::new("C1", "A1", "alan", 1),
        Lead::new("C1", "A1", "edsger", 2),
    ];
    let ids = repo
        .refresh_all(&company("C1"), &replacements, None)
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(repo.count(Some(&company("C1")), None).await.unwrap(), 2);

    let id = repo
        .refresh(&company("C2"), &Lead::new("C2", "A1", "dennis", 3), None)
        .await
        .unwrap();
    let stored = repo.get_all(Some(&company("C2")), None, None).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, Some(id));
}

#[tokio::test]
async fn test_invalid_update_is_rejected() {
    let repo = repository();
    seed(&repo).await;

    let err = repo
        .execute_update(None, &UpdateSpec::new().inc("name", 1), None)
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::InvalidUpdate(_)));
    // nothing was committed
    assert_eq!(repo.count(Some(&company("C1")), None).await.unwrap(), 3);
}

// =============================================================================
// Failure modes
// =============================================================================

#[tokio::test]
async fn test_outage_propagates_unavailable() {
    let url = format!("memory://repo-outage-{}", Uuid::new_v4());
    let client = MemoryClient::connect(ClientSettings::new(url)).unwrap();
    let server = Arc::clone(client.server());
    let handle = ClientHandle::with_client(Arc::new(client));
    let repo = Repository::<Lead>::new(&handle, "crm").unwrap();

    server.set_available(false);
    let err = repo.get_all(None, None, None).await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_cancelled_call_returns_cancelled() {
    let repo = repository();
    let token = CancellationToken::new();
    token.cancel();

    let err = repo
        .add(&Lead::new("C1", "A1", "ada", 1), Some(&token))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Cancelled));
}

#[test]
fn test_repository_requires_client() {
    let err = Repository::<Lead>::new(&ClientHandle::new(), "crm").unwrap_err();
    assert_eq!(err.code(), "CONFIGURATION_ERROR");
}

#[test]
fn test_blocking_variants() {
    let repo = repository();

    let id = repo.add_blocking(&Lead::new("C1", "A1", "ada", 40)).unwrap();
    repo.add_range_blocking(&[Lead::new("C1", "A2", "grace", 75)]).unwrap();

    assert_eq!(repo.count_blocking(Some(&company("C1"))).unwrap(), 2);
    assert!(repo.any_blocking(&with_id(id)).unwrap());
    assert_eq!(
        repo.get_blocking(&with_id(id), None).unwrap().map(|l| l.name),
        Some("ada".to_string())
    );

    let page = repo.get_page_blocking(0, 1, None, None).unwrap();
    assert_eq!(page.pages, 2);
    assert!(page.has_next());

    assert_eq!(repo.max_blocking::<i64>("score").unwrap(), Some(75));
    assert_eq!(repo.execute_delete_blocking(&company("C1")).unwrap().deleted_count, 2);
    assert!(repo.get_all_blocking(None, None).unwrap().is_empty());
}

#[test]
fn test_page_index_far_past_the_end() {
    let repo = repository();
    repo.add_blocking(&Lead::new("C1", "A1", "ada", 40)).unwrap();

    let page = repo.get_page_blocking(u64::MAX, 10, None, None).unwrap();

    assert!(page.is_empty());
    assert_eq!(page.pages, 1);
    assert!(!page.has_next());
    assert!(page.has_previous());
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Tag {
    #[serde(rename = "_id")]
    id: String,
    label: String,
}

impl Entity for Tag {}

#[tokio::test]
async fn test_uppercase_string_id_can_be_reused_after_delete() {
    common::telemetry::init_test_tracing();
    let url = format!("memory://tags-{}", Uuid::new_v4());
    let client = MemoryClient::connect(ClientSettings::new(url)).unwrap();
    let repo = Repository::<Tag>::new(&ClientHandle::with_client(Arc::new(client)), "crm").unwrap();

    let tag = Tag {
        id: EntityId::new().to_hex().to_uppercase(),
        label: "vip".to_string(),
    };
    let by_id = {
        let id = tag.id.clone();
        Predicate::<Tag>::new(move |it| it.id_field().eq(id))
    };

    repo.add(&tag, None).await.unwrap();
    assert_eq!(repo.execute_delete(&by_id, None).await.unwrap().deleted_count, 1);
    assert_eq!(repo.count(None, None).await.unwrap(), 0);

    repo.add(&tag, None).await.unwrap();
    assert_eq!(repo.get(&by_id, None, None).await.unwrap(), Some(tag));
}
