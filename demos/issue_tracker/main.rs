//! Issue tracker example: one specification, two backends

use anyhow::Result;
use specter::prelude::*;
use tracing_subscriber::EnvFilter;

impl_entity!(Issue, "issues", {
    title: String,
    assigned_to: Option<String>,
    priority: i64,
    archived: bool,
});

impl_child_entity!(Project, "projects", { name: String });

const ISSUE_PROJECT: Relation<Issue, Project> = Relation::new("project");

const CONFIG: &str = r#"
entities:
  - name: issues
    table: tracker_issues
    global_filters:
      - op: eq
        field: archived
        value: false
cache:
  max_capacity: 100
  ttl_seconds: 60
"#;

/// Issues assigned to `user`, highest priority first
fn my_issues(user: &str, search: Option<&str>) -> SpecResult<Specification<Issue>> {
    let builder = Specification::<Issue>::builder()
        .filter(Criterion::eq("assigned_to", user))
        .search_if("title", search.unwrap_or_default(), search.is_some())
        .include(ISSUE_PROJECT)
        .order_by_descending("priority")
        .then_by("id")
        .enable_cache("MyIssues", [user])?
        .vary_by(search.unwrap_or("all"));
    Ok(builder.build())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Specter issue tracker example\n");

    let config = EngineConfig::from_yaml_str(CONFIG)?;
    let issues = vec![
        Issue::new("Login page broken".into(), Some("bob".into()), 3, false).with_id(1),
        Issue::new("Beta signup copy".into(), Some("amy".into()), 1, false).with_id(2),
        Issue::new("Gamma rollout".into(), Some("bob".into()), 2, false).with_id(3),
        Issue::new("Old login bug".into(), Some("bob".into()), 5, true).with_id(4),
    ];

    let spec = my_issues("bob", None)?;

    // In memory: no global filters, so the archived issue is included
    let in_memory = spec.evaluate(issues.clone())?;
    println!("In memory:");
    for issue in &in_memory {
        println!("  #{} {} (priority {})", issue.id, issue.title, issue.priority);
    }

    // Through a repository: the configured global filter hides archived issues
    let store = InMemoryStore::<Issue>::from_config(&config);
    store.seed(issues)?;
    let repository = StoreRepository::<Issue, _>::from_config(store, &config);

    let stored = repository.get_by_spec(&spec, None).await?;
    println!("\nThrough the repository:");
    for issue in &stored {
        println!("  #{} {} (priority {})", issue.id, issue.title, issue.priority);
    }
    println!(
        "  cached under {:?}: {}",
        spec.cache_key(),
        spec.cache_key().is_some_and(|k| repository.is_cached(k))
    );

    // Search narrows further; the SQL shows the translated form
    let login = my_issues("bob", Some("%login%"))?;
    let plan = SpecificationEvaluator::<QueryPlan<Issue>>::default().get_query(
        QueryPlan::new(),
        &login,
        false,
    )?;
    let statement = plan.to_sql(
        &config.table_for("issues"),
        &config.global_filters_for("issues"),
    );
    println!("\nSQL: {}", statement.sql);
    println!("params: {:?}", statement.params);

    // Projection
    let titles = Specification::<Issue, String>::builder()
        .filter(Criterion::eq("assigned_to", "bob"))
        .order_by("title")
        .select(|issue| issue.title.clone())
        .build();
    println!(
        "\nTitles: {:?}",
        repository.get_projected_by_spec(&titles, None).await?
    );

    // Writes invalidate the cache
    let added = repository
        .add(Issue::new("New crash".into(), Some("bob".into()), 4, false))
        .await?;
    println!("\nAdded #{}", added.id);
    println!(
        "bob now has {} open issues",
        repository.count_by_spec(&spec, None).await?
    );

    Ok(())
}
