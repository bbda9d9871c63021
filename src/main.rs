use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use bugview::config::Config;
use bugview::{Client, HotlistRef, HttpTransport, IssueListParams, IssueRef, UserRef, Views};

#[derive(Parser, Debug)]
#[command(name = "bugview")]
#[command(about = "Query an issue tracker through its client-side data layer")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/bugview/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Fetch one issue and show it with its blocked-on issues
  Issue {
    /// proj:123, b/123456, or projects/proj/issues/123
    issue_ref: String,
  },
  /// Run a query and list matching issues
  List {
    query: String,
    #[arg(short, long)]
    project: Option<String>,
    #[arg(long)]
    max_items: Option<u32>,
  },
  /// Star or unstar an issue
  Star {
    issue_ref: String,
    #[arg(long)]
    unstar: bool,
  },
  /// Show a hotlist and its items
  Hotlist {
    /// owner@example.com:HotlistName
    hotlist: String,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;
  let transport = HttpTransport::new(&config.tracker.url, Config::get_api_token())?;
  let client = Client::new(transport);

  match args.command {
    Command::Issue { issue_ref } => show_issue(&client, &issue_ref).await,
    Command::List {
      query,
      project,
      max_items,
    } => list_issues(&client, &config, query, project, max_items).await,
    Command::Star { issue_ref, unstar } => star(&client, &issue_ref, !unstar).await,
    Command::Hotlist { hotlist } => show_hotlist(&client, &hotlist).await,
  }
}

fn parse_ref(input: &str) -> Result<IssueRef> {
  IssueRef::parse(input).ok_or_else(|| eyre!("Unrecognized issue ref: {input}"))
}

async fn show_issue(client: &Client<HttpTransport>, issue_ref: &str) -> Result<()> {
  let iref = parse_ref(issue_ref)?;
  client.fetch_issue(&iref).await;

  let mut views = Views::default();
  let store = client.store();
  if let Some(error) = &store.requests.fetch_issue.error {
    return Err(eyre!("Fetch failed: {error}"));
  }
  let Some(issue) = store.issue.viewed_issue() else {
    return Err(eyre!("Issue {} not found", iref.key()));
  };

  println!("{}  {}", issue.entity_key(), issue.summary.as_deref().unwrap_or(""));
  if let Some(status) = &issue.status_ref {
    println!("  status: {}", status.status);
  }
  if let Some(owner) = &issue.owner_ref {
    println!("  owner: {}", owner.key());
  }
  if let Some(stars) = issue.star_count {
    let starred = if store.issue.is_starred(&issue.entity_key()) {
      " (starred by you)"
    } else {
      ""
    };
    println!("  stars: {stars}{starred}");
  }

  let blocked_on = views.sorted_blocked_on(&store);
  if !blocked_on.is_empty() {
    println!("  blocked on:");
    for blocker in blocked_on.iter() {
      let state = if blocker.is_open() { "open" } else { "closed" };
      println!(
        "    {} [{}] {}",
        blocker.entity_key(),
        state,
        blocker.summary.as_deref().unwrap_or("")
      );
    }
  }
  Ok(())
}

async fn list_issues(
  client: &Client<HttpTransport>,
  config: &Config,
  query: String,
  project: Option<String>,
  max_items: Option<u32>,
) -> Result<()> {
  let params = IssueListParams {
    projects: project
      .or_else(|| config.default_project.clone())
      .into_iter()
      .collect(),
    query,
    max_items,
    items_per_page: config.list.items_per_page,
    max_parallel_calls: config.list.max_parallel_calls,
    ..IssueListParams::default()
  };
  client.fetch_issue_list(&params).await;

  let store = client.store();
  if let Some(error) = &store.requests.fetch_issue_list.error {
    return Err(eyre!("List fetch failed: {error}"));
  }
  let list = store.issue.list();
  println!(
    "{} of {} matching issues",
    list.ordered_keys.len(),
    list.total_results
  );
  for key in &list.ordered_keys {
    let summary = store
      .issue
      .issue(key)
      .and_then(|i| i.summary.clone())
      .unwrap_or_default();
    println!("  {key}  {summary}");
  }
  Ok(())
}

async fn star(client: &Client<HttpTransport>, issue_ref: &str, starred: bool) -> Result<()> {
  let iref = parse_ref(issue_ref)?;
  client.star_issue(&iref, starred).await;

  let store = client.store();
  let key = iref.key();
  if let Some(error) = &store.requests.star.get(&key).error {
    return Err(eyre!("Star request failed: {error}"));
  }
  let count = store
    .issue
    .issue(&key)
    .and_then(|i| i.star_count)
    .unwrap_or(0);
  println!(
    "{key} {} ({count} stars)",
    if starred { "starred" } else { "unstarred" }
  );
  Ok(())
}

async fn show_hotlist(client: &Client<HttpTransport>, hotlist: &str) -> Result<()> {
  let (owner, name) = hotlist
    .split_once(':')
    .ok_or_else(|| eyre!("Expected owner@example.com:HotlistName, got {hotlist}"))?;
  let href = HotlistRef {
    owner: UserRef::from_display_name(owner),
    name: name.to_string(),
  };
  tokio::join!(client.fetch_hotlist(&href), client.fetch_hotlist_items(&href));

  let mut views = Views::default();
  let store = client.store();
  let key = href.key();
  if let Some(error) = &store.requests.fetch_hotlist.error {
    return Err(eyre!("Hotlist fetch failed: {error}"));
  }
  if let Some(hotlist) = store.hotlist.hotlist(&key) {
    println!("{}  {}", key, hotlist.summary.as_deref().unwrap_or(""));
  }
  for entry in views.hotlist_items(&store, &key).iter() {
    println!(
      "  #{} {}  {}",
      entry.item.rank,
      entry.issue.entity_key(),
      entry.issue.summary.as_deref().unwrap_or("")
    );
  }
  Ok(())
}
