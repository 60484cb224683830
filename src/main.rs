use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use devscore::analysis::BatchOutcome;
use devscore::config::DEFAULT_DATABASE_PATH;
use devscore::models::{rank_by_stars, Report, ReportOptions, ReportSummary, Repository, RepositoryAnalysis};
use devscore::{AnalyzerConfig, Config, GitHubClient, RepositoryAnalyzer, ReportAggregator, Storage};

#[derive(Parser, Debug)]
#[command(name = "devscore")]
#[command(version = "0.1.0")]
#[command(about = "Score GitHub repositories and share developer health reports")]
struct Args {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,

    /// Output file (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<String>,

    /// Database path for storing results (overrides DATABASE_PATH)
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List owned repositories, most starred first
    Repos,

    /// Analyze repositories and store the results
    Analyze {
        /// Repository to analyze (repeatable). Defaults to the most starred ones.
        #[arg(short, long = "repo")]
        repos: Vec<String>,

        /// How many top repositories to analyze when none are named
        #[arg(long, default_value = "5")]
        top: usize,

        /// Size of the trailing commit histogram in months
        #[arg(long)]
        window_months: Option<u32>,
    },

    /// Build a report from stored analyses
    Report {
        /// Repository to include (repeatable). Defaults to every stored analysis.
        #[arg(short, long = "repo")]
        repos: Vec<String>,

        /// Report title
        #[arg(long)]
        name: Option<String>,

        /// Make the report readable through a share token
        #[arg(long)]
        public: bool,
    },

    /// Open a public report by its share token
    Show { token: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
    Markdown,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("devscore=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();

    match &args.command {
        // Public reports need no GitHub token
        Command::Show { token } => emit(&args, show_report(&args, token)?),
        Command::Repos => {
            let session = Session::connect(&args).await?;
            let repos = rank_by_stars(session.github.owned_repositories().await?);
            emit(&args, render_repositories(&repos, args.format)?)
        }
        Command::Analyze {
            repos,
            top,
            window_months,
        } => {
            let session = Session::connect(&args).await?;
            let names = if repos.is_empty() {
                rank_by_stars(session.github.owned_repositories().await?)
                    .into_iter()
                    .take(*top)
                    .map(|r| r.name)
                    .collect()
            } else {
                repos.clone()
            };
            if names.is_empty() {
                anyhow::bail!("No repositories to analyze");
            }

            let mut analyzer_config = AnalyzerConfig::from(&session.config);
            analyzer_config.username = Some(session.login.clone());
            if let Some(months) = window_months {
                anyhow::ensure!(*months > 0, "--window-months must be at least 1");
                analyzer_config.window_months = *months;
            }

            let login = session.login;
            let storage = session.storage;
            let analyzer = RepositoryAnalyzer::new(session.github, analyzer_config);
            tracing::info!("Analyzing {} repositories for {}", names.len(), login);
            let batch = analyzer.spawn_batch(&login, &names);

            let canceller = batch.canceller();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, cancelling remaining analyses");
                    canceller.cancel_all();
                }
            });

            let outcome = batch.join().await;
            for analysis in &outcome.analyses {
                storage.save_analysis(analysis)?;
            }
            tracing::info!("Saved {} analyses", outcome.analyses.len());

            emit(&args, render_outcome(&outcome, args.format)?)
        }
        Command::Report {
            repos,
            name,
            public,
        } => {
            let session = Session::connect(&args).await?;
            let analyses = if repos.is_empty() {
                session.storage.list_analyses(&session.login)?
            } else {
                session.storage.get_analyses(&session.login, repos)?
            };

            let report = ReportAggregator::new().build(
                &analyses,
                ReportOptions {
                    name: name.clone(),
                    is_public: *public,
                },
            )?;
            session.storage.save_report(&report)?;

            emit(&args, render_report(&report, args.format)?)
        }
    }
}

/// Everything the GitHub-backed commands share.
struct Session {
    config: Config,
    storage: Storage,
    github: GitHubClient,
    login: String,
}

impl Session {
    async fn connect(args: &Args) -> anyhow::Result<Self> {
        let config = Config::from_env()?;
        let storage = Storage::new(args.database.as_deref().unwrap_or(&config.database_path))?;
        let github = GitHubClient::from_config(&config)?;

        let login = match &config.github_username {
            Some(name) => name.clone(),
            None => github.authenticated_user().await?.login,
        };

        Ok(Self {
            config,
            storage,
            github,
            login,
        })
    }
}

/// Opens a public report from the local database only.
fn show_report(args: &Args, token: &str) -> anyhow::Result<String> {
    let database = args
        .database
        .clone()
        .or_else(|| std::env::var("DATABASE_PATH").ok())
        .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());
    let storage = Storage::new(&database)?;
    let report = storage.open_public_report(token)?;
    let analyses = storage.get_analyses(&report.account, &report_names(&report))?;
    let summary = ReportAggregator::new().summarize(report, analyses);
    render_summary(&summary, args.format)
}

/// Repository names referenced by a report, whose keys are `owner/name`.
fn report_names(report: &Report) -> Vec<String> {
    report
        .repository_ids
        .iter()
        .map(|key| key.rsplit('/').next().unwrap_or(key).to_string())
        .collect()
}

fn emit(args: &Args, output: String) -> anyhow::Result<()> {
    if let Some(ref path) = args.output {
        std::fs::write(path, &output)?;
        tracing::info!("Output written to: {}", path);
    } else {
        println!("{}", output);
    }
    Ok(())
}

fn render_repositories(repos: &[Repository], format: Format) -> anyhow::Result<String> {
    if format == Format::Json {
        return Ok(serde_json::to_string_pretty(repos)?);
    }

    let mut output = String::new();
    if format == Format::Markdown {
        output.push_str("| Repository | Language | Stars | Forks |\n");
        output.push_str("|------------|----------|-------|-------|\n");
    }
    for repo in repos {
        let language = repo.language.as_deref().unwrap_or("-");
        match format {
            Format::Markdown => output.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                repo.name, language, repo.stargazers_count, repo.forks_count
            )),
            _ => output.push_str(&format!(
                "{:<40} {:<14} ★ {:<6} forks {}\n",
                repo.name, language, repo.stargazers_count, repo.forks_count
            )),
        }
    }
    Ok(output)
}

fn render_outcome(outcome: &BatchOutcome, format: Format) -> anyhow::Result<String> {
    if format == Format::Json {
        return Ok(serde_json::to_string_pretty(&outcome.analyses)?);
    }

    let mut output = String::new();
    for analysis in &outcome.analyses {
        output.push_str(&match format {
            Format::Markdown => format_analysis_markdown(analysis),
            _ => format_analysis_text(analysis),
        });
    }

    for (name, error) in &outcome.failures {
        output.push_str(&format!("\n! {} failed: {}\n", name, error));
    }
    for name in &outcome.cancelled {
        output.push_str(&format!("\n! {} cancelled\n", name));
    }
    Ok(output)
}

fn format_analysis_text(analysis: &RepositoryAnalysis) -> String {
    let mut output = String::new();

    output.push_str(&format!("\n=== {} ===\n\n", analysis.key()));
    if let Some(ref description) = analysis.description {
        output.push_str(&format!("{}\n", description));
    }
    output.push_str(&format!(
        "Stars: {}  Forks: {}\n",
        analysis.stars, analysis.forks
    ));

    output.push_str("\nScores:\n");
    output.push_str(&format!("  Code quality:  {}/100\n", analysis.scores.code_quality));
    output.push_str(&format!("  Collaboration: {}/100\n", analysis.scores.collaboration));
    output.push_str(&format!("  Consistency:   {}/100\n", analysis.scores.consistency));

    output.push_str(&format!(
        "\nCommits: {} total, {} by {} (~{}/month)\n",
        analysis.commits.total,
        analysis.commits.user_commits,
        analysis.account,
        analysis.commits.average_per_month
    ));
    let histogram: Vec<String> = analysis
        .commits
        .by_month
        .iter()
        .map(|b| format!("{}-{}: {}", b.year, b.month, b.commits))
        .collect();
    output.push_str(&format!("  {}\n", histogram.join(", ")));

    output.push_str(&format!(
        "Contributors: {}  Issues: {}  Pull requests: {}\n",
        analysis.collaboration.contributors,
        analysis.collaboration.issues,
        analysis.collaboration.pull_requests
    ));
    output.push_str(&format!(
        "README: {}  License: {}  Tests: {}  Documentation: {}/100\n",
        yes_no(analysis.code_quality.has_readme),
        yes_no(analysis.code_quality.has_license),
        yes_no(analysis.code_quality.has_tests),
        analysis.code_quality.documentation_score
    ));

    if !analysis.languages.is_empty() {
        let languages: Vec<String> = analysis
            .languages
            .iter()
            .map(|l| format!("{} {}%", l.name, l.percentage))
            .collect();
        output.push_str(&format!("Languages: {}\n", languages.join(", ")));
    }

    output
}

fn format_analysis_markdown(analysis: &RepositoryAnalysis) -> String {
    let mut output = String::new();

    output.push_str(&format!("## [{}]({})\n\n", analysis.key(), analysis.repository_url));
    if let Some(ref description) = analysis.description {
        output.push_str(&format!("> {}\n\n", description));
    }

    output.push_str("| Metric | Value |\n|--------|-------|\n");
    output.push_str(&format!("| Code Quality | {}/100 |\n", analysis.scores.code_quality));
    output.push_str(&format!("| Collaboration | {}/100 |\n", analysis.scores.collaboration));
    output.push_str(&format!("| Consistency | {}/100 |\n", analysis.scores.consistency));
    output.push_str(&format!("| Commits (yours) | {} |\n", analysis.commits.user_commits));
    output.push_str(&format!("| Contributors | {} |\n", analysis.collaboration.contributors));
    output.push_str(&format!("| Stars | {} |\n", analysis.stars));

    output.push('\n');
    output
}

fn render_report(report: &Report, format: Format) -> anyhow::Result<String> {
    if format == Format::Json {
        return Ok(serde_json::to_string_pretty(report)?);
    }

    let mut output = String::new();
    output.push_str(&format!("{}\n", report.name));
    output.push_str(&format!("Developer score: {}/100\n", report.overall_score));
    output.push_str(&format!(
        "{} repositories, {} commits, {} stars\n",
        report.total_repositories, report.total_commits, report.total_stars
    ));
    match report.share_token {
        Some(ref token) => output.push_str(&format!("Share token: {}\n", token)),
        None => output.push_str("Private report\n"),
    }
    Ok(output)
}

fn render_summary(summary: &ReportSummary, format: Format) -> anyhow::Result<String> {
    if format == Format::Json {
        return Ok(serde_json::to_string_pretty(summary)?);
    }

    let report = &summary.report;
    let mut output = String::new();

    match format {
        Format::Markdown => {
            output.push_str(&format!("# {}\n\n", report.name));
            output.push_str(&format!("**Developer Score:** {}/100\n\n", report.overall_score));
            output.push_str("| Metric | Value |\n|--------|-------|\n");
            output.push_str(&format!("| Repositories | {} |\n", report.total_repositories));
            output.push_str(&format!("| Commits | {} |\n", report.total_commits));
            output.push_str(&format!("| Stars | {} |\n", report.total_stars));
            output.push_str(&format!("| Contributors | {} |\n", summary.total_contributors));
            output.push_str(&format!(
                "| Avg. Documentation | {}/100 |\n",
                summary.average_documentation_score
            ));

            if !summary.top_languages.is_empty() {
                output.push_str("\n## Top Languages\n\n");
                for lang in &summary.top_languages {
                    output.push_str(&format!("- {} ({}%)\n", lang.name, lang.percentage));
                }
            }

            output.push('\n');
            for analysis in &summary.analyses {
                output.push_str(&format_analysis_markdown(analysis));
            }
            output.push_str(&format!("---\n*Viewed {} times*\n", report.view_count));
        }
        _ => {
            output.push_str(&format!("\n=== {} ===\n\n", report.name));
            output.push_str(&format!("Developer score: {}/100\n", report.overall_score));
            output.push_str(&format!(
                "{} repositories analyzed, {} commits, {} stars earned\n",
                report.total_repositories, report.total_commits, report.total_stars
            ));
            output.push_str(&format!(
                "Contributors: {}  Avg. documentation: {}/100\n",
                summary.total_contributors, summary.average_documentation_score
            ));

            if !summary.top_languages.is_empty() {
                output.push_str("\nTop languages:\n");
                for lang in &summary.top_languages {
                    output.push_str(&format!("  - {} ({}%)\n", lang.name, lang.percentage));
                }
            }

            for analysis in &summary.analyses {
                output.push_str(&format_analysis_text(analysis));
            }
            output.push_str(&format!("\nViews: {}\n", report.view_count));
        }
    }

    Ok(output)
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_reads_only_the_database() {
        let args = Args::try_parse_from(["devscore", "--database", ":memory:", "show", "abc123XYZ0"])
            .unwrap();
        let Command::Show { token } = &args.command else {
            panic!("expected the show command");
        };

        let err = show_report(&args, token).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<devscore::Error>(),
            Some(devscore::Error::ReportNotFound(_))
        ));
    }

    #[test]
    fn test_report_names_strip_owner() {
        let keys = ["alice/web", "alice/api"];
        let report = Report {
            account: "alice".to_string(),
            name: "Report for alice".to_string(),
            repository_ids: keys.iter().map(|k| k.to_string()).collect(),
            total_repositories: 2,
            total_commits: 0,
            total_stars: 0,
            overall_score: 0,
            is_public: true,
            share_token: Some("abc123XYZ0".to_string()),
            view_count: 0,
            created_at: chrono::Utc::now(),
        };

        assert_eq!(report_names(&report), vec!["api".to_string(), "web".to_string()]);
    }
}
