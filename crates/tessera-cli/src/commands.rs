use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context as _};
use colored::Colorize;
use tessera_remote::{
    ClusterConfig, DialConfig, DialProvider, EnvDialProvider, ReplicaDialProvider, RoleInterceptor,
    WebPkiValidator,
};
use tessera_store::FileChunkStore;
use tessera_types::{Format, Hash};
use tessera_value::{Context, Sequence, SequenceCursor, TreeBuilder, ValueStore};
use tracing::{debug, info};

use crate::cli::*;
use crate::config::RepoConfig;
use crate::json;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Init(args) => cmd_init(&cli.repo, args),
        Command::Put(args) => cmd_put(&cli.repo, args).await,
        Command::Show(args) => cmd_show(&cli.repo, args).await,
        Command::Walk(args) => cmd_walk(&cli.repo, args).await,
        Command::Stats(args) => cmd_stats(&cli.repo, args).await,
        Command::Cluster(args) => cmd_cluster(args),
    }
}

async fn open_store(repo: &Path) -> anyhow::Result<(RepoConfig, ValueStore)> {
    let config = RepoConfig::load(repo)?;
    let chunks = FileChunkStore::open(RepoConfig::chunks_path(repo)).await?;
    debug!(repo = %repo.display(), format = %config.format, "opened repository");
    Ok((config.clone(), ValueStore::new(Arc::new(chunks), config.format)))
}

fn parse_hash(s: &str) -> anyhow::Result<Hash> {
    Hash::from_hex(s).with_context(|| format!("invalid hash {s:?}"))
}

fn cmd_init(repo: &Path, args: InitArgs) -> anyhow::Result<()> {
    if RepoConfig::config_path(repo).exists() {
        anyhow::bail!("repository already exists at {}", repo.display());
    }
    let mut config = RepoConfig::default();
    if let Some(format) = args.format {
        config.format = format.parse::<Format>().map_err(|e| anyhow!(e))?;
    }
    if let Some(size) = args.chunk_size {
        anyhow::ensure!(size >= 2, "chunk size must be at least 2");
        config.chunk_size = size;
    }
    config.save(repo)?;
    std::fs::create_dir_all(RepoConfig::chunks_path(repo))?;

    println!("{} Initialized tessera repository in {}", "✓".green().bold(), repo.display().to_string().bold());
    println!("  Format: {}", config.format.to_string().cyan());
    println!("  Chunk size: {}", config.chunk_size);
    Ok(())
}

async fn cmd_put(repo: &Path, args: PutArgs) -> anyhow::Result<()> {
    let (config, store) = open_store(repo).await?;
    let doc: serde_json::Value = serde_json::from_str(&args.json).context("parsing JSON input")?;
    let builder = TreeBuilder::new(store.clone()).with_chunk_size(config.chunk_size);

    let value = json::to_value(&builder, &doc, args.set).await?;
    let r = store.write_value(&value).await?;
    info!(hash = %r.target().short_hex(), kind = %r.target_kind(), height = r.height(), "value stored");
    println!("{} {} {}", "✓".green().bold(), r.target_kind().to_string().cyan(), r.target().to_hex().yellow());
    Ok(())
}

async fn cmd_show(repo: &Path, args: ShowArgs) -> anyhow::Result<()> {
    let (_, store) = open_store(repo).await?;
    let ctx = Context::background();
    let value = store.read_value(&ctx, &parse_hash(&args.hash)?).await?;
    let doc = json::to_json(&ctx, &value).await?;
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

async fn cmd_walk(repo: &Path, args: WalkArgs) -> anyhow::Result<()> {
    let (_, store) = open_store(repo).await?;
    let ctx = Context::background();
    let root = store.read_sequence(&ctx, &parse_hash(&args.hash)?).await?;
    let total = root.num_leaves();
    if total == 0 {
        println!("(empty {})", root.kind());
        return Ok(());
    }

    let start = match (args.from, args.reverse) {
        (Some(i), _) => i,
        (None, false) => 0,
        (None, true) => total - 1,
    };
    debug!(start, total, reverse = args.reverse, "walking collection");
    let mut cursor = SequenceCursor::at_index(&ctx, root, start).await?;
    let limit = args.limit.unwrap_or(usize::MAX);
    let mut printed = 0;
    while cursor.valid() && printed < limit {
        let index = cursor.leaf_index().unwrap_or_default();
        println!("{:>8}  {}", index.to_string().dimmed(), json::summarize_item(&cursor.current()));
        printed += 1;
        if args.reverse {
            cursor.retreat(&ctx).await?;
        } else {
            cursor.advance(&ctx).await?;
        }
    }
    Ok(())
}

async fn cmd_stats(repo: &Path, args: StatsArgs) -> anyhow::Result<()> {
    let (_, store) = open_store(repo).await?;
    let ctx = Context::background();
    let root = store.read_sequence(&ctx, &parse_hash(&args.hash)?).await?;

    println!("Kind:   {}", root.kind().to_string().cyan());
    println!("Format: {}", root.format());
    println!("Height: {}", root.tree_level() + 1);
    println!("Items:  {}", root.num_leaves());

    let mut level = vec![root];
    loop {
        let chunks = level.len();
        let items: usize = level.iter().map(|s| s.seq_len()).sum();
        println!(
            "  level {}: {} chunk(s), {} item(s)",
            level[0].tree_level(),
            chunks.to_string().bold(),
            items
        );
        if level[0].is_leaf() {
            break;
        }
        level = load_children(&ctx, &level).await?;
        if level.is_empty() {
            break;
        }
    }
    Ok(())
}

async fn load_children(ctx: &Context, parents: &[Arc<Sequence>]) -> anyhow::Result<Vec<Arc<Sequence>>> {
    let mut children = Vec::new();
    for parent in parents {
        for i in 0..parent.seq_len() {
            children.push(parent.get_child_sequence(ctx, i).await?);
        }
    }
    Ok(children)
}

fn cmd_cluster(args: ClusterArgs) -> anyhow::Result<()> {
    let cluster = ClusterConfig::load(&args.config)?;
    let role = Arc::new(RoleInterceptor::new(cluster.bootstrap_role, cluster.bootstrap_epoch));
    let provider = ReplicaDialProvider::new(
        Arc::new(EnvDialProvider),
        cluster.clone(),
        role,
        Arc::new(WebPkiValidator),
    );

    println!("Role: {} (epoch {})", cluster.bootstrap_role.to_string().yellow(), cluster.bootstrap_epoch);
    if cluster.standby_remotes.is_empty() {
        println!("No standby remotes configured.");
        return Ok(());
    }
    for remote in &cluster.standby_remotes {
        let url = remote.url_for(&args.database);
        let endpoint = url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&url)
            .to_string();
        let params = provider.dial_params(DialConfig {
            endpoint,
            ..Default::default()
        })?;
        debug!(remote = %remote.name, url = %params.url, tls = params.tls.is_some(), "resolved dial params");

        println!("{} {}", remote.name.bold(), params.url.blue());
        match &params.tls {
            Some(tls) => println!(
                "  TLS: {} root(s) from {}",
                tls.roots().len(),
                tls.roots().source().display()
            ),
            None => println!("  TLS: system defaults"),
        }
        for (key, value) in params.request_metadata() {
            println!("  {key}: {value}");
        }
        println!(
            "  Backoff: base {:?}, max {:?}, min connect timeout {:?}",
            params.connect.backoff.base_delay,
            params.connect.backoff.max_delay,
            params.connect.min_connect_timeout
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(repo: &Path, args: &[&str]) -> Cli {
        let mut argv = vec!["tessera", "-C", repo.to_str().unwrap()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn init_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        run_command(cli(dir.path(), &["init", "--chunk-size", "4"])).await.unwrap();
        assert!(RepoConfig::chunks_path(dir.path()).is_dir());
        assert_eq!(RepoConfig::load(dir.path()).unwrap().chunk_size, 4);

        let err = run_command(cli(dir.path(), &["init"])).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("lock poisoned").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn put_logs_stored_value() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let dir = tempfile::tempdir().unwrap();
        run_command(cli(dir.path(), &["init"])).await.unwrap();
        run_command(cli(dir.path(), &["put", "[1,2]"])).await.unwrap();

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("opened repository"), "{logs}");
        assert!(logs.contains("value stored"), "{logs}");
        assert!(logs.contains("kind=List"), "{logs}");
    }

    #[tokio::test]
    async fn init_rejects_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run_command(cli(dir.path(), &["init", "--format", "9.9"])).await.is_err());
    }

    #[tokio::test]
    async fn put_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        run_command(cli(dir.path(), &["init", "--chunk-size", "2"])).await.unwrap();
        run_command(cli(dir.path(), &["put", "[1,2,3,4,5]"])).await.unwrap();

        let (config, store) = open_store(dir.path()).await.unwrap();
        let builder = TreeBuilder::new(store.clone()).with_chunk_size(config.chunk_size);
        let doc = serde_json::json!([1, 2, 3, 4, 5]);
        let value = json::to_value(&builder, &doc, false).await.unwrap();
        let hash = value.hash(config.format).to_hex();

        run_command(cli(dir.path(), &["show", &hash])).await.unwrap();
        run_command(cli(dir.path(), &["walk", &hash, "--reverse"])).await.unwrap();
        run_command(cli(dir.path(), &["walk", &hash, "--from", "3", "-n", "1"])).await.unwrap();
        run_command(cli(dir.path(), &["stats", &hash])).await.unwrap();
    }

    #[tokio::test]
    async fn show_unknown_hash_fails() {
        let dir = tempfile::tempdir().unwrap();
        run_command(cli(dir.path(), &["init"])).await.unwrap();
        let missing = Hash::of(Format::Ld1, b"missing").to_hex();
        assert!(run_command(cli(dir.path(), &["show", &missing])).await.is_err());
        assert!(run_command(cli(dir.path(), &["show", "xyz"])).await.is_err());
    }

    #[tokio::test]
    async fn commands_outside_repo_fail() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run_command(cli(dir.path(), &["put", "1"])).await.is_err());
    }

    #[tokio::test]
    async fn cluster_reports_remotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster.toml");
        std::fs::write(
            &path,
            "[[standby_remotes]]\nname = \"west\"\nremote_url_template = \"https://west:50051/{database}\"\n",
        )
        .unwrap();
        run_command(cli(dir.path(), &["cluster", path.to_str().unwrap()])).await.unwrap();
    }
}
