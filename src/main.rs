mod auth;
mod client;
mod config;
mod error;
mod form;
mod models;
mod notify;
mod session;
mod submit;
mod telemetry;
mod tui;
mod validate;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client::HttpTransport;
use config::AppConfig;
use error::SubmitError;
use form::ApplicationForm;
use models::{Field, Role, Route, User};
use notify::{ConsoleNotifier, Navigator, RouteRecorder};
use session::Session;
use std::path::PathBuf;
use submit::Coordinator;
use telemetry::LogTarget;
use tui::FormExit;

#[derive(Parser)]
#[command(name = "apply")]
#[command(about = "Fill in and submit job applications")]
struct Cli {
    /// API base URL (overrides APPLY_API_BASE)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Request timeout in seconds (overrides APPLY_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive application form for a job
    Form {
        /// Job ID
        job_id: String,
    },

    /// Submit an application in one go
    Submit {
        /// Job ID
        job_id: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        phone: String,

        #[arg(long)]
        address: String,

        /// Cover letter text
        #[arg(long, conflicts_with = "cover_letter_file")]
        cover_letter: Option<String>,

        /// Read the cover letter from a file
        #[arg(long)]
        cover_letter_file: Option<PathBuf>,

        /// Resume file (.pdf, .jpg, .jpeg, .png; at most 5MB)
        #[arg(short, long)]
        resume: PathBuf,

        /// Declared type of the resume, instead of guessing from the extension
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Manage the saved sign-in session
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Save the session cookie and who it belongs to
    Set {
        /// Value of the `token` cookie issued at login
        #[arg(short, long)]
        token: String,

        /// Account role (Job Seeker, Employer)
        #[arg(short, long, default_value = "Job Seeker")]
        role: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },

    /// Show the saved session
    Show,

    /// Forget the saved session
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()
        .and_then(|config| config.with_overrides(cli.api_base.as_deref(), cli.timeout))
        .context("Invalid configuration")?;

    let log_target = match cli.command {
        Commands::Form { .. } => LogTarget::File(config.log_file.clone()),
        _ => LogTarget::Stderr,
    };
    telemetry::init(&config.log_level, &log_target)?;

    match cli.command {
        Commands::Form { job_id } => {
            let session = Session::load(&config.session_file)?;
            let auth = session::auth_context(session.as_ref());
            let transport = HttpTransport::new(
                &config.api_base,
                config.timeout,
                session.as_ref().map(|s| s.token.as_str()),
            )
            .context("Failed to set up HTTP client")?;

            let runtime = tokio::runtime::Runtime::new()?;
            let exit = tui::run_form(runtime.handle(), &auth, Some(job_id), transport)?;

            match exit {
                FormExit::Navigated {
                    route: Route::Home,
                    ..
                } => print_redirect_home(),
                FormExit::Navigated { route, notice } => {
                    if let Some(notice) = notice {
                        println!("{}", notice.message);
                    }
                    println!("Next: {}{}", config.api_base, route.path());
                }
                FormExit::Cancelled => println!("Application discarded."),
            }
        }

        Commands::Submit {
            job_id,
            name,
            email,
            phone,
            address,
            cover_letter,
            cover_letter_file,
            resume,
            content_type,
        } => {
            let session = Session::load(&config.session_file)?;
            let auth = session::auth_context(session.as_ref());
            if let auth::Access::Redirect(route) = auth::check(&auth) {
                RouteRecorder::default().navigate(route);
                print_redirect_home();
                return Ok(());
            }

            let cover_letter = match (cover_letter, cover_letter_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path).with_context(|| {
                    format!("Failed to read cover letter file: {}", path.display())
                })?,
                (None, None) => String::new(),
            };

            let mut form = ApplicationForm::new(Some(job_id));
            form.set_field(Field::Name, name);
            form.set_field(Field::Email, email);
            form.set_field(Field::Phone, phone);
            form.set_field(Field::Address, address);
            form.set_field(Field::CoverLetter, cover_letter);

            let mut notifier = ConsoleNotifier::default();
            if !form.select_resume_path(
                &resume.to_string_lossy(),
                content_type.as_deref(),
                &mut notifier,
            ) {
                bail!("Resume not accepted: {}", resume.display());
            }

            let transport = HttpTransport::new(
                &config.api_base,
                config.timeout,
                session.as_ref().map(|s| s.token.as_str()),
            )
            .context("Failed to set up HTTP client")?;
            tracing::info!(endpoint = %transport.endpoint(), job_id = ?form.job_id(), "sending application");
            let coordinator = Coordinator::new(transport);
            let mut nav = RouteRecorder::default();

            let runtime = tokio::runtime::Runtime::new()?;
            let result = runtime.block_on(coordinator.submit(&mut form, &mut notifier, &mut nav));

            match result {
                Ok(_) => {
                    if let Some(route) = nav.route {
                        println!("Next: {}{}", config.api_base, route.path());
                    }
                }
                Err(SubmitError::Rejected { status, .. }) => {
                    return Err(anyhow!("Application rejected by server (status {})", status));
                }
                Err(_) => return Err(anyhow!("Application was not submitted")),
            }
        }

        Commands::Session { command } => match command {
            SessionCommands::Set {
                token,
                role,
                name,
                email,
            } => {
                let role = Role::from(role);
                let session = Session::new(
                    token,
                    Some(User {
                        name,
                        email,
                        role: role.clone(),
                    }),
                );
                session.save(&config.session_file)?;
                println!(
                    "Saved session for role '{}' to {}",
                    role,
                    config.session_file.display()
                );
                if role == Role::Employer {
                    println!("Note: employers cannot submit applications.");
                }
            }

            SessionCommands::Show => match Session::load(&config.session_file)? {
                Some(session) => {
                    println!("Session file: {}", config.session_file.display());
                    println!("Token: {}", mask_token(&session.token));
                    if let Some(user) = &session.user {
                        println!("Role: {}", user.role);
                        if let Some(name) = &user.name {
                            println!("Name: {}", name);
                        }
                        if let Some(email) = &user.email {
                            println!("Email: {}", email);
                        }
                    }
                    println!("Saved: {}", session.saved_at.format("%Y-%m-%d %H:%M:%S UTC"));
                }
                None => println!("Not signed in."),
            },

            SessionCommands::Clear => {
                if Session::clear(&config.session_file)? {
                    println!("Session cleared.");
                } else {
                    println!("No session to clear.");
                }
            }
        },
    }

    Ok(())
}

fn print_redirect_home() {
    println!("Only signed-in job seekers can apply. Redirected to /");
    println!("Save a session first: apply session set --token <TOKEN>");
}

fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 4 {
        "*".repeat(token.chars().count())
    } else {
        format!("{}...", visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("abcdefgh"), "abcd...");
        assert_eq!(mask_token("abc"), "***");
        assert_eq!(mask_token(""), "");
    }

    #[test]
    fn test_cli_parses_submit() {
        let cli = Cli::try_parse_from([
            "apply",
            "--api-base",
            "http://127.0.0.1:4000",
            "submit",
            "job-9",
            "--name",
            "Ada",
            "--email",
            "ada@example.com",
            "--phone",
            "555",
            "--address",
            "London",
            "--cover-letter",
            "Hello",
            "--resume",
            "cv.pdf",
        ])
        .unwrap();

        assert_eq!(cli.api_base.as_deref(), Some("http://127.0.0.1:4000"));
        match cli.command {
            Commands::Submit {
                job_id,
                cover_letter,
                resume,
                ..
            } => {
                assert_eq!(job_id, "job-9");
                assert_eq!(cover_letter.as_deref(), Some("Hello"));
                assert_eq!(resume, PathBuf::from("cv.pdf"));
            }
            _ => panic!("expected submit"),
        }
    }

    #[test]
    fn test_cli_rejects_both_cover_letter_sources() {
        let result = Cli::try_parse_from([
            "apply",
            "submit",
            "job-9",
            "--name",
            "Ada",
            "--email",
            "ada@example.com",
            "--phone",
            "555",
            "--address",
            "London",
            "--cover-letter",
            "Hello",
            "--cover-letter-file",
            "letter.txt",
            "--resume",
            "cv.pdf",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_session_set_defaults_to_job_seeker() {
        let cli = Cli::try_parse_from(["apply", "session", "set", "--token", "t"]).unwrap();
        match cli.command {
            Commands::Session {
                command: SessionCommands::Set { role, .. },
            } => assert_eq!(Role::from(role), Role::JobSeeker),
            _ => panic!("expected session set"),
        }
    }
}
