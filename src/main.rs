use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use travelmap::budget::{self, BudgetOverview, ExpenseCategory, ExpenseDraft};
use travelmap::config::TravelMapConfig;
use travelmap::plan_stream::PlanRequest;
use travelmap::render::{self, MapScene, PlanRenderer, Progress};
use travelmap::{
    AppState, BackendClient, GeocodeResolver, ParsedTravelInfo, PlanDocument, User, logging,
};

#[derive(Parser)]
#[command(name = "travelmap")]
#[command(version)]
#[command(about = "Put generated travel plans on a map")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, short, global = true, env = "TRAVELMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Signed-in user for commands that touch stored plans
    #[arg(long, short, global = true, env = "TRAVELMAP_USER_ID")]
    user_id: Option<String>,

    /// Debug logging for travelmap
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a free-text address to `lng,lat`
    Geocode { address: String },

    /// Center a map on a destination, printing the map scene as JSON
    Locate { destination: String },

    /// Resolve and route a plan file, printing the map scene as JSON
    Show { plan: PathBuf },

    /// Print a plan as shareable text
    Text { plan: PathBuf },

    /// Print a plan as a printable HTML document
    Html { plan: PathBuf },

    /// Extract plan form fields from a spoken request
    Parse { text: String },

    /// Generate a new plan through the backend
    Generate {
        /// Spoken request filling in the fields not given as options
        #[arg(long)]
        from_text: Option<String>,
        #[arg(long)]
        destination: Option<String>,
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        budget: Option<f64>,
        #[arg(long)]
        travelers: Option<u32>,
        #[arg(long)]
        preferences: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        start_date: Option<String>,
        /// Also save the generated plan as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Stored plans of the signed-in user
    Plans {
        #[command(subcommand)]
        action: Option<PlanAction>,
    },

    /// Spending against a stored plan's budget
    Budget {
        plan_id: String,
        #[command(subcommand)]
        action: Option<BudgetAction>,
    },
}

#[derive(Subcommand)]
enum PlanAction {
    /// List plans (default)
    List,
    /// Print one plan as JSON
    Get { id: String },
    Delete { id: String },
}

#[derive(Subcommand)]
enum BudgetAction {
    /// Spent against budget and per-category totals (default)
    Overview,
    /// Recorded expenses
    Expenses,
    /// Record an expense
    Add {
        /// Sentence such as "打车花了35元"; options override what it yields
        #[arg(long)]
        from_text: Option<String>,
        /// 交通, 住宿, 餐饮, 门票, 购物 or 其他
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        description: Option<String>,
        /// YYYY-MM-DD, today when omitted
        #[arg(long)]
        date: Option<String>,
    },
    /// Backend spending recommendations
    Analysis,
}

fn load_plan(path: &Path) -> Result<PlanDocument> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan file: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid plan file: {}", path.display()))
}

fn backend(config: &TravelMapConfig) -> Result<BackendClient> {
    BackendClient::new(&config.backend, &config.geocoding.user_agent)
        .context("Failed to create backend client")
}

async fn show(config: &TravelMapConfig, path: &Path) -> Result<ExitCode> {
    let plan = load_plan(path)?;
    let renderer = PlanRenderer::from_config(config, backend(config)?)?;
    let mut scene = MapScene::default();
    let result = renderer
        .show_plan_on_map(&plan, &mut scene, |p: &Progress| {
            let mark = if p.resolved { "✓" } else { "✗" };
            eprintln!("[{:>3}%] {} {}", p.percent(), p.message(), mark);
        })
        .await;

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("⚠️ {}", e.user_message());
            return Ok(ExitCode::FAILURE);
        }
    };

    eprintln!(
        "✅ {}: {}/{} 个地点, {}",
        summary.title,
        summary.located,
        summary.total,
        summary.route_overview()
    );
    if !summary.unresolved.is_empty() {
        eprintln!("❌ 无法定位: {}", summary.unresolved.join(", "));
    }
    if let Some(notice) = &summary.notice {
        eprintln!("⚠️ {notice}");
    }

    println!("{}", serde_json::to_string_pretty(&scene)?);
    Ok(ExitCode::SUCCESS)
}

async fn locate(config: &TravelMapConfig, destination: &str) -> Result<ExitCode> {
    let renderer = PlanRenderer::from_config(config, backend(config)?)?;
    let mut scene = MapScene::default();
    match renderer.locate_destination(destination, &mut scene).await {
        Ok(place) => {
            eprintln!("📍 {} ({})", scene.title, place.stage);
            println!("{}", serde_json::to_string_pretty(&scene)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("无法定位到\"{}\"，请检查地名是否正确", destination.trim());
            info!("Locate failed: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn generate(
    config: &TravelMapConfig,
    state: &AppState,
    from_text: Option<String>,
    options: ParsedTravelInfo,
    output: Option<PathBuf>,
) -> Result<()> {
    let user = state.require_user("generate a plan")?;
    let backend = backend(config)?;

    let mut request = PlanRequest {
        destination: String::new(),
        days: 0,
        budget: 0.0,
        travelers: 1,
        preferences: String::new(),
        start_date: None,
    };
    if let Some(text) = from_text {
        let parsed = backend.parse_voice_text(&text).await?;
        for field in parsed.fields_found() {
            eprintln!("🎤 {field}");
        }
        parsed.fill(&mut request);
    }
    // options given on the command line win over recognised speech
    options.fill(&mut request);

    let plan = backend
        .generate_plan(&user.user_id, &request, |progress, message| {
            eprintln!("[{progress:>3}%] {message}");
        })
        .await?;

    if let Some(path) = output {
        std::fs::write(&path, serde_json::to_string_pretty(&plan)?)
            .with_context(|| format!("Failed to write plan file: {}", path.display()))?;
        info!("Saved plan to {}", path.display());
    }

    println!("{}", render::render_plan_text(&plan));
    Ok(())
}

async fn plans(config: &TravelMapConfig, state: &AppState, action: PlanAction) -> Result<()> {
    let user = state.require_user("manage plans")?;
    let backend = backend(config)?;

    match action {
        PlanAction::List => {
            let plans = backend.list_plans(&user.user_id).await?;
            if plans.is_empty() {
                println!("暂无旅行计划");
            }
            for plan in plans {
                let stats = render::plan_stats(&plan);
                println!(
                    "{}\t{}\t{}天\t{}个景点\t{}个餐厅\t{}",
                    plan.id.as_deref().unwrap_or("-"),
                    plan.destination,
                    plan.days,
                    stats.activities,
                    stats.restaurants,
                    stats.feature_tags.join(" ")
                );
            }
        }
        PlanAction::Get { id } => {
            let plan = backend.get_plan(&id, &user.user_id).await?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        PlanAction::Delete { id } => {
            backend.delete_plan(&id, &user.user_id).await?;
            println!("已删除 {id}");
        }
    }
    Ok(())
}

async fn track_budget(
    config: &TravelMapConfig,
    state: &AppState,
    plan_id: &str,
    action: BudgetAction,
) -> Result<()> {
    let user = state.require_user("track a budget")?;
    let backend = backend(config)?;

    match action {
        BudgetAction::Overview => {
            let plan = backend.get_plan(plan_id, &user.user_id).await?;
            let expenses = backend.list_expenses(plan_id, &user.user_id).await?;
            let overview = BudgetOverview::new(plan.budget, &expenses);

            println!("{} - {}天", plan.destination, plan.days);
            println!(
                "预算 ¥{:.2} · 已花费 ¥{:.2} · 剩余 ¥{:.2}",
                overview.total_budget, overview.total_spent, overview.remaining
            );
            let mark = if overview.is_warning() { "⚠️" } else { "" };
            println!("{} {mark}", overview.usage_text());

            let chart = budget::category_totals(&expenses);
            if chart.is_empty() {
                println!("暂无统计数据");
            }
            for row in chart {
                let bar = "█".repeat((row.share_of_max / 5.0).round() as usize);
                println!(
                    "{} {}\t{bar} ¥{:.2}",
                    row.category.icon(),
                    row.category,
                    row.amount
                );
            }
        }
        BudgetAction::Expenses => {
            let expenses = backend.list_expenses(plan_id, &user.user_id).await?;
            if expenses.is_empty() {
                println!("暂无费用记录");
            }
            for expense in expenses {
                println!(
                    "{} {}\t{}\t{}\t-¥{:.2}",
                    expense.category.icon(),
                    expense.category,
                    expense.day(),
                    expense.description,
                    expense.amount
                );
            }
        }
        BudgetAction::Add {
            from_text,
            category,
            amount,
            description,
            date,
        } => {
            let mut draft = match from_text {
                Some(text) => {
                    let draft = budget::parse_expense_text(&text);
                    if !draft.is_complete() {
                        eprintln!("⚠️ 部分识别成功: {text}");
                    }
                    draft
                }
                None => ExpenseDraft {
                    category: ExpenseCategory::Other,
                    amount: None,
                    description: String::new(),
                },
            };
            if let Some(category) = category {
                draft.category = ExpenseCategory::from_label(&category);
            }
            if amount.is_some() {
                draft.amount = amount;
            }
            if let Some(description) = description {
                draft.description = description;
            }

            let expense = draft.into_expense(plan_id, date)?;
            backend.add_expense(&user.user_id, &expense).await?;
            println!(
                "费用添加成功: {} ¥{:.2} {}",
                expense.category, expense.amount, expense.description
            );
        }
        BudgetAction::Analysis => {
            let analysis = backend.budget_analysis(plan_id, &user.user_id).await?;
            if analysis.recommendations.is_empty() {
                println!("暂无AI建议，请先添加一些费用记录");
            }
            for recommendation in &analysis.recommendations {
                println!("💡 {recommendation}");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = TravelMapConfig::load_from_path(cli.config.clone())?;
    logging::init(&config.logging, cli.verbose)?;
    info!("travelmap {}", travelmap::VERSION);

    let mut state = AppState::new();
    if let Some(user_id) = cli.user_id.filter(|id| !id.trim().is_empty()) {
        state.login(User::from_id(user_id));
    }

    match cli.command {
        Command::Geocode { address } => {
            let resolver = GeocodeResolver::from_config(&config, backend(&config)?)?;
            let coordinates = resolver.resolve(&address).await?;
            println!("{coordinates}");
        }
        Command::Locate { destination } => return locate(&config, &destination).await,
        Command::Show { plan } => return show(&config, &plan).await,
        Command::Text { plan } => print!("{}", render::render_plan_text(&load_plan(&plan)?)),
        Command::Html { plan } => print!("{}", render::render_plan_html(&load_plan(&plan)?)),
        Command::Parse { text } => {
            let parsed = backend(&config)?.parse_voice_text(&text).await?;
            let fields = parsed.fields_found();
            if fields.is_empty() {
                eprintln!("⚠️ 未能识别出旅行信息");
            }
            for field in fields {
                eprintln!("✓ {field}");
            }
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
        Command::Generate {
            from_text,
            destination,
            days,
            budget,
            travelers,
            preferences,
            start_date,
            output,
        } => {
            let options = ParsedTravelInfo {
                destination,
                days,
                budget,
                travelers,
                preferences,
                start_date,
            };
            generate(&config, &state, from_text, options, output).await?;
        }
        Command::Plans { action } => {
            plans(&config, &state, action.unwrap_or(PlanAction::List)).await?;
        }
        Command::Budget { plan_id, action } => {
            track_budget(&config, &state, &plan_id, action.unwrap_or(BudgetAction::Overview))
                .await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
