use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, instrument};

use crate::analysis::{
    API_COVERAGE_REPORT, COMPLIANCE_REPORT, DEFAULT_BRIDGE_DIR, DICTIONARY_REPORT, TABLES_REPORT,
    TEST_COVERAGE_REPORT, TEST_COVERAGE_SUMMARY, analyze_api_coverage, analyze_dictionary_coverage,
    analyze_tables, analyze_test_coverage, check_ai_compliance,
};
use crate::api::{API_TEST_REPORT, ApiTester, CheckOutcome, HttpTransport, Platform, RunOptions, Suite, TestDepth};
use crate::auth::{Permission, Role, grant_permissions};
use crate::config::AppConfig;
use crate::database::Migrator;
use crate::db::Database;
use crate::error::AppError;
use crate::report::ReportWriter;
use crate::router::{QueryRouter, Tier, execute_decision};
use crate::seed::{
    DEFAULT_MONTHLY_CONVERSIONS, DOCUMENT_TEMPLATES, DemoOptions, PAGE_GUIDES, ReferralPlan,
    TeachingVariant, remove_document_templates, seed_demo, seed_document_templates,
    seed_page_guides, seed_referrals, seed_teaching_center,
};
use crate::swagger::{SWAGGER_FILE, SwaggerOptions, generate_swagger};

#[derive(Debug, Parser)]
#[command(name = "kinder-ops", version, about = "Operations toolkit for the kindergarten management backend")]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply the schema migrations that are not yet present
    Migrate {
        /// Print the pending steps without applying them
        #[arg(long)]
        dry_run: bool,
    },
    /// Populate the database with generated data
    Seed {
        #[command(subcommand)]
        target: SeedCommand,
    },
    /// Link roles to permissions, creating either when missing
    GrantPermissions {
        /// Role to grant to; repeatable. Defaults to every role
        #[arg(long = "role")]
        roles: Vec<String>,
        /// Permission code to grant; repeatable. Defaults to the role's full set
        #[arg(long = "permission")]
        permissions: Vec<String>,
    },
    /// Write an analysis report to the reports directory
    Analyze {
        #[command(subcommand)]
        target: AnalyzeCommand,
    },
    /// Generate an OpenAPI document from the route annotations
    Swagger {
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, env = "API_BASE_URL")]
        server_url: Option<String>,
    },
    /// Run the REST API test suites against a running server
    ApiTest {
        #[arg(long = "suite", value_enum, default_values_t = [Suite::Comprehensive])]
        suites: Vec<Suite>,
        #[arg(long, value_enum, default_value_t = TestDepth::Standard)]
        depth: TestDepth,
        #[arg(long, value_delimiter = ',', default_value = "admin")]
        roles: Vec<String>,
        #[arg(long, value_enum)]
        platform: Option<Platform>,
    },
    /// Route a natural-language question to a processing tier
    Ask {
        question: String,
        /// Answer direct and template queries from the database
        #[arg(long)]
        execute: bool,
    },
    /// Show rule and keyword counts of the query router
    RouterStats,
}

#[derive(Debug, Subcommand)]
pub enum SeedCommand {
    /// A complete demo kindergarten
    Demo {
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 2)]
        classes_per_grade: usize,
        #[arg(long, default_value_t = 20)]
        students_per_class: usize,
    },
    /// Referral relationships and rewards over consecutive months
    Referral {
        /// Converted referrals per month, oldest first
        #[arg(long, value_delimiter = ',')]
        monthly: Vec<u32>,
    },
    /// Courses, course plans and class progress
    TeachingCenter {
        #[arg(long, value_enum, default_value_t = TeachingVariant::Standard)]
        variant: TeachingVariant,
    },
    /// Page guides and their sections
    PageGuides,
    /// Inspection and record-keeping document templates
    DocumentTemplates {
        /// Delete the catalog's templates instead of inserting them
        #[arg(long)]
        remove: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum AnalyzeCommand {
    /// Row counts and structure of every table
    Tables,
    /// Tables referenced by the AI dictionaries versus the database
    Dictionary {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Direct AI provider calls outside the AI Bridge
    Compliance {
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_BRIDGE_DIR)]
        bridge_dir: String,
    },
    /// Documented endpoints versus the ones the API suites exercise
    ApiCoverage {
        #[arg(long)]
        routes_dir: Option<PathBuf>,
    },
    /// Source components that no test file matches
    TestCoverage {
        #[arg(long)]
        root: Option<PathBuf>,
        /// Extra test directory outside the root; repeatable
        #[arg(long = "tests")]
        test_dirs: Vec<PathBuf>,
    },
}

impl Command {
    pub fn needs_database(&self) -> bool {
        match self {
            Command::Migrate { .. } | Command::Seed { .. } | Command::GrantPermissions { .. } => true,
            Command::Analyze { target } => {
                matches!(target, AnalyzeCommand::Tables | AnalyzeCommand::Dictionary { .. })
            }
            Command::Ask { execute, .. } => *execute,
            Command::Swagger { .. } | Command::ApiTest { .. } | Command::RouterStats => false,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Runs one command. A database connection is opened only for commands
/// that need one and is closed again whatever the result.
pub async fn run(command: Command, config: &AppConfig) -> Result<(), AppError> {
    if !command.needs_database() {
        return run_offline(command, config).await;
    }

    let db = Database::connect(&config.database).await?;
    let result = run_with_database(command, &db, config).await;
    db.close().await;
    result
}

async fn run_offline(command: Command, config: &AppConfig) -> Result<(), AppError> {
    let reports = ReportWriter::new(&config.paths.reports_dir);

    match command {
        Command::Analyze {
            target: AnalyzeCommand::Compliance { root, bridge_dir },
        } => {
            let root = root.unwrap_or_else(|| config.paths.source_dir.clone());
            let report = check_ai_compliance(&root, &bridge_dir)?;
            let path = reports.write_json(COMPLIANCE_REPORT, &report)?;
            println!(
                "{} files scanned, {} with violations ({} violations), compliance {:.2}%",
                report.files_scanned,
                report.files_with_violations,
                report.violations.len(),
                report.compliance_rate
            );
            println!("Report written to {}", path.display());
            Ok(())
        }
        Command::Analyze {
            target: AnalyzeCommand::ApiCoverage { routes_dir },
        } => {
            let routes_dir = routes_dir.unwrap_or_else(|| config.paths.routes_dir.clone());
            let report = analyze_api_coverage(&routes_dir)?;
            let path = reports.write_markdown(API_COVERAGE_REPORT, &report.to_markdown())?;
            println!(
                "{} documented, {} tested, coverage {:.2}%",
                report.documented.len(),
                report.tested.len(),
                report.coverage_rate
            );
            println!("Report written to {}", path.display());
            Ok(())
        }
        Command::Analyze {
            target: AnalyzeCommand::TestCoverage { root, test_dirs },
        } => {
            let root = root.unwrap_or_else(|| config.paths.source_dir.clone());
            let report = analyze_test_coverage(&root, &test_dirs)?;
            reports.write_json(TEST_COVERAGE_REPORT, &report)?;
            let path = reports.write_markdown(TEST_COVERAGE_SUMMARY, &report.to_markdown())?;
            println!(
                "{}/{} components covered ({:.2}%), health {:.2} ({}), {} alerts",
                report.covered_components,
                report.total_components,
                report.coverage_rate,
                report.health_score,
                report.health_status,
                report.alerts.len()
            );
            println!("Report written to {}", path.display());
            Ok(())
        }
        Command::Swagger { output, server_url } => {
            let mut options = SwaggerOptions::default();
            if let Some(url) = server_url {
                options.server_url = url;
            }
            let document = generate_swagger(&config.paths.routes_dir, &options)?;
            let path = match output {
                Some(path) => {
                    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, serde_json::to_string_pretty(&document.spec)?)?;
                    path
                }
                None => reports.write_json(SWAGGER_FILE, &document.spec)?,
            };
            println!(
                "{} endpoints, {} tags, {} duplicates skipped",
                document.endpoints, document.tags, document.duplicates
            );
            println!("OpenAPI document written to {}", path.display());
            Ok(())
        }
        Command::ApiTest {
            suites,
            depth,
            roles,
            platform,
        } => run_api_tests(config, &reports, suites, depth, roles, platform).await,
        Command::Ask { question, .. } => {
            let router = QueryRouter::with_dictionary(&config.paths.dictionary_dir);
            let decision = router.route(&question);
            print_json(&decision)
        }
        Command::RouterStats => {
            let router = QueryRouter::with_dictionary(&config.paths.dictionary_dir);
            print_json(&router.stats())
        }
        other => Err(AppError::Internal(format!(
            "Command {:?} requires a database connection",
            other
        ))),
    }
}

#[instrument(skip(db, config))]
async fn run_with_database(command: Command, db: &Database, config: &AppConfig) -> Result<(), AppError> {
    let reports = ReportWriter::new(&config.paths.reports_dir);

    match command {
        Command::Migrate { dry_run } => {
            let migrator = Migrator::with_catalog(db);
            if dry_run {
                let pending = migrator.plan().await?;
                if pending.is_empty() {
                    println!("Schema is up to date");
                }
                for step in &pending {
                    println!("[{}] {}\n    {}", step.migration, step.step, step.sql);
                }
                return Ok(());
            }

            let report = migrator.run().await?;
            println!(
                "{} steps applied, {} already present",
                report.applied(),
                report.skipped()
            );
            Ok(())
        }
        Command::Seed { target } => match target {
            SeedCommand::Demo {
                seed,
                classes_per_grade,
                students_per_class,
            } => {
                let options = DemoOptions {
                    seed,
                    classes_per_grade,
                    students_per_class,
                    ..DemoOptions::default()
                };
                print_json(&seed_demo(db, &options, &config.seed).await?)
            }
            SeedCommand::Referral { monthly } => {
                let monthly = if monthly.is_empty() {
                    DEFAULT_MONTHLY_CONVERSIONS.to_vec()
                } else {
                    monthly
                };
                let plan = ReferralPlan::ending_this_month(monthly);
                print_json(&seed_referrals(db, &plan).await?)
            }
            SeedCommand::TeachingCenter { variant } => {
                print_json(&seed_teaching_center(db, variant).await?)
            }
            SeedCommand::PageGuides => print_json(&seed_page_guides(db, PAGE_GUIDES).await?),
            SeedCommand::DocumentTemplates { remove: false } => {
                print_json(&seed_document_templates(db, DOCUMENT_TEMPLATES).await?)
            }
            SeedCommand::DocumentTemplates { remove: true } => {
                let removed = remove_document_templates(db).await?;
                print_json(&serde_json::json!({ "removed": removed }))
            }
        },
        Command::GrantPermissions { roles, permissions } => {
            let roles = if roles.is_empty() {
                Role::ALL.to_vec()
            } else {
                roles
                    .iter()
                    .map(|r| Role::from_str(r).map_err(|e| AppError::Validation(e.to_string())))
                    .collect::<Result<Vec<_>, _>>()?
            };
            let permissions = permissions
                .iter()
                .map(|p| Permission::from_code(p).map_err(|e| AppError::Validation(e.to_string())))
                .collect::<Result<Vec<_>, _>>()?;

            print_json(&grant_permissions(db, &roles, &permissions).await?)
        }
        Command::Analyze { target } => match target {
            AnalyzeCommand::Tables => {
                let report = analyze_tables(db).await?;
                let path = reports.write_json(TABLES_REPORT, &report)?;
                println!(
                    "{} tables, {} rows, {} empty",
                    report.total_tables,
                    report.total_rows,
                    report.empty_tables.len()
                );
                println!("Report written to {}", path.display());
                Ok(())
            }
            AnalyzeCommand::Dictionary { dir } => {
                let dir = dir.unwrap_or_else(|| config.paths.dictionary_dir.clone());
                let report = analyze_dictionary_coverage(db, &dir).await?;
                let path = reports.write_json(DICTIONARY_REPORT, &report)?;
                println!(
                    "{} of {} tables covered ({:.2}%), {} unknown tables referenced",
                    report.covered_tables.len(),
                    report.database_tables,
                    report.coverage_rate,
                    report.unknown_tables.len()
                );
                println!("Report written to {}", path.display());
                Ok(())
            }
            other => run_offline(Command::Analyze { target: other }, config).await,
        },
        Command::Ask { question, .. } => {
            let router = QueryRouter::with_dictionary(&config.paths.dictionary_dir);
            let decision = router.route(&question);
            print_json(&decision)?;

            match execute_decision(db, &decision).await? {
                Some(result) => print_json(&result),
                None if decision.tier == Tier::Complex => {
                    println!("Complex queries are answered by the AI Bridge; nothing executed");
                    Ok(())
                }
                None => {
                    println!("This action needs the AI Bridge; nothing executed");
                    Ok(())
                }
            }
        }
        other => run_offline(other, config).await,
    }
}

async fn run_api_tests(
    config: &AppConfig,
    reports: &ReportWriter,
    suites: Vec<Suite>,
    depth: TestDepth,
    roles: Vec<String>,
    platform: Option<Platform>,
) -> Result<(), AppError> {
    let tester = ApiTester::new(HttpTransport::new(&config.api)?, config.api.clone());
    let options = RunOptions {
        depth,
        roles,
        platform,
    };

    info!("Running {} suites against {}", suites.len(), config.api.base_url);
    let run = tester.run(&suites, &options).await;
    let path = reports.write_markdown(API_TEST_REPORT, &run.to_markdown())?;

    println!(
        "{} passed, {} failed, {} need auth, {} not found",
        run.count(CheckOutcome::Passed),
        run.count(CheckOutcome::Failed),
        run.count(CheckOutcome::AuthRequired),
        run.count(CheckOutcome::NotFound)
    );
    println!("Report written to {}", path.display());

    if run.has_failures() {
        return Err(AppError::Validation(format!(
            "{} API checks failed",
            run.count(CheckOutcome::Failed)
        )));
    }
    Ok(())
}
