//! Nyayasathi command-line client entry point.
//!
//! Citizens file and manage complaints, reviewers work through the complaint
//! list, and both can use the legal assistant.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nyayasathi::assistant::LegalAssistant;
use nyayasathi::auth::{AuthClient, Registration};
use nyayasathi::board::ComplaintBoard;
use nyayasathi::client::BackendClient;
use nyayasathi::config::ClientConfig;
use nyayasathi::error::{ErrorContext, NyayaError, Result};
use nyayasathi::filter::{FilterSet, Selector};
use nyayasathi::models::{ComplaintId, ComplaintStatus, Emotion, Priority, ReviewTarget};
use nyayasathi::rbac::{require_permission, Permission, RoleType};
use nyayasathi::render;
use nyayasathi::repository::{AudioComplaint, HttpComplaintRepository, TextComplaint};
use nyayasathi::session::{FileSessionStore, SessionContext};

#[derive(Parser, Debug)]
#[command(name = "nyayasathi", version, about = "Nyayasathi complaint client")]
struct Cli {
    /// Backend base URL (overrides NYAYASATHI_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Session file (overrides NYAYASATHI_SESSION_PATH)
    #[arg(long, global = true)]
    session_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the session
    Login {
        username: String,
        #[arg(long)]
        password: String,
        /// `user` or `cop`
        #[arg(long, default_value = "user")]
        role: RoleType,
    },

    /// Create an account and log in
    Register {
        /// Username, or badge id when registering as `cop`
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        #[arg(long, default_value = "user")]
        role: RoleType,
    },

    /// Forget the stored session
    Logout,

    /// Show who is logged in
    Whoami,

    /// List complaints visible to the current user
    List {
        #[arg(long, default_value = "all")]
        priority: Selector<Priority>,
        #[arg(long, default_value = "all")]
        emotion: Selector<Emotion>,
        #[arg(long, default_value = "all")]
        status: Selector<ComplaintStatus>,
    },

    /// Show one complaint in full
    Show { id: ComplaintId },

    /// Move a complaint to under_review, reviewed or failed
    Review {
        id: ComplaintId,
        status: ReviewTarget,
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Delete one of your complaints
    Delete { id: ComplaintId },

    /// File a text complaint
    SubmitText {
        #[arg(long)]
        name: String,
        #[arg(long)]
        location: String,
        content: String,
    },

    /// File a complaint from an audio recording
    SubmitAudio {
        #[arg(long)]
        name: String,
        #[arg(long)]
        location: String,
        file: PathBuf,
    },

    /// Preview the transcript and analysis of a recording without filing it
    Transcribe {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        location: String,
        file: PathBuf,
    },

    /// Detect the language of a piece of text
    DetectLanguage { text: String },

    /// Ask the legal chatbot a question
    Ask { question: String },

    /// Summarise a legal document
    Summarize {
        file: PathBuf,
        /// Write the extracted document text here for later questions
        #[arg(long)]
        text_out: Option<PathBuf>,
        /// Ask a question about the document right away
        #[arg(long)]
        question: Option<String>,
    },

    /// Ask a question about a document's extracted text
    AskDocument {
        /// Text file produced by `summarize --text-out`
        #[arg(long)]
        document: PathBuf,
        question: String,
    },

    /// Show build information
    Version,
}

/// Everything a command needs, built from configuration.
struct App {
    config: ClientConfig,
    client: BackendClient,
    session: SessionContext,
}

impl App {
    fn new(config: ClientConfig) -> Result<Self> {
        let client = BackendClient::new(&config)?;
        let store = Arc::new(FileSessionStore::new(config.session_path.clone()));
        Ok(Self {
            config,
            client,
            session: SessionContext::new(store),
        })
    }

    fn auth(&self) -> AuthClient {
        AuthClient::new(self.client.clone(), self.session.clone())
    }

    fn repository(&self) -> HttpComplaintRepository {
        HttpComplaintRepository::new(self.client.clone())
    }

    fn assistant(&self) -> LegalAssistant {
        LegalAssistant::new(self.client.clone(), self.config.chatbot_model.clone())
    }

    fn board(&self) -> ComplaintBoard<HttpComplaintRepository> {
        ComplaintBoard::new(Arc::new(self.repository()), self.session.clone())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    // Logs go to stderr so command output stays pipeable.
    // RUST_LOG overrides the default level, e.g. RUST_LOG=nyayasathi=debug
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            if e.requires_reauthentication() {
                eprintln!("Your session has ended. Run `nyayasathi login` to sign in again.");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Command::Version = cli.command {
        print_version();
        return Ok(());
    }

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.api_url.as_deref() {
        config = config.with_api_url(url)?;
    }
    if let Some(path) = cli.session_path {
        config = config.with_session_path(path);
    }
    tracing::debug!(api_url = %config.api_url, "Configuration loaded");

    let app = App::new(config)?;
    let result = execute(&app, cli.command).await;

    if let Err(e) = &result {
        if e.requires_reauthentication() {
            if let Err(clear_err) = app.session.clear() {
                tracing::warn!(error = %clear_err, "Failed to clear session");
            }
        }
    }
    result
}

async fn execute(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Login {
            username,
            password,
            role,
        } => {
            let principal = app.auth().login(&username, &password, role).await?;
            println!("{}", render::welcome_line(&principal));
        }

        Command::Register {
            username,
            email,
            first_name,
            last_name,
            password,
            confirm_password,
            role,
        } => {
            let registration = Registration {
                username,
                email,
                first_name,
                last_name,
                password,
                confirm_password,
                role,
            };
            let principal = app.auth().register(&registration).await?;
            println!("Registration successful.");
            println!("{}", render::welcome_line(&principal));
        }

        Command::Logout => {
            app.auth().logout()?;
            println!("Logged out.");
        }

        Command::Whoami => match app.session.current_principal() {
            Some(principal) => {
                println!("{}", render::welcome_line(&principal));
                println!("  id:   {}", principal.id);
                println!("  role: {}", principal.role);
                if let Some(cop_id) = principal.cop_id.as_deref() {
                    println!("  badge: {}", cop_id);
                }
            }
            None => return Err(NyayaError::SessionMissing),
        },

        Command::List {
            priority,
            emotion,
            status,
        } => {
            let (principal, _) = app.session.require()?;
            let mut board = app.board();
            board.refresh().await?;

            let filters = FilterSet::new(priority, emotion, status);
            board.set_filters(filters);
            let visible = board.visible();

            println!("{}", render::welcome_line(&principal));
            print!(
                "{}",
                render::complaint_table(principal.role, &visible, !filters.is_unfiltered())
            );
        }

        Command::Show { id } => {
            let mut board = app.board();
            board.refresh().await?;
            let complaint = board.open(id)?;
            print!("{}", render::complaint_detail(complaint));
        }

        Command::Review { id, status, notes } => {
            let mut board = app.board();
            board.refresh().await?;
            board.open(id)?;
            board.set_draft_notes(notes);
            board.review_selected(status).await?;

            match board.find(id) {
                Some(complaint) => print!("{}", render::complaint_detail(complaint)),
                None => println!("Complaint #{} updated.", id),
            }
        }

        Command::Delete { id } => {
            let mut board = app.board();
            board.refresh().await?;
            board.delete(id).await?;
            println!("Complaint #{} deleted.", id);
        }

        Command::SubmitText {
            name,
            location,
            content,
        } => {
            let (principal, credential) = app.session.require()?;
            require_permission(&principal, Permission::SubmitComplaint)?;
            let complaint = TextComplaint {
                name,
                location,
                content,
            };
            let receipt = app
                .repository()
                .submit_text(&complaint, &credential)
                .await
                .map_err(|e| log_failure(e.into(), "submit_text", principal.id))?;
            print!("{}", render::submission_receipt(&receipt));
        }

        Command::SubmitAudio {
            name,
            location,
            file,
        } => {
            let (principal, credential) = app.session.require()?;
            require_permission(&principal, Permission::SubmitComplaint)?;
            let audio = std::fs::read(&file)?;
            let complaint = AudioComplaint {
                name,
                location,
                file_name: file_name_of(&file),
                audio,
            };
            let receipt = app
                .repository()
                .submit_audio(complaint, &credential)
                .await
                .map_err(|e| log_failure(e.into(), "submit_audio", principal.id))?;
            print!("{}", render::submission_receipt(&receipt));
        }

        Command::Transcribe {
            name,
            location,
            file,
        } => {
            let credential = app.session.credential();
            let recording = AudioComplaint {
                name,
                location,
                file_name: file_name_of(&file),
                audio: std::fs::read(&file)?,
            };
            let receipt = app
                .repository()
                .transcribe(recording, credential.as_ref())
                .await?;
            print!("{}", render::transcription_preview(&receipt));
        }

        Command::DetectLanguage { text } => {
            let credential = app.session.credential();
            match app
                .assistant()
                .detect_language(&text, credential.as_ref())
                .await?
            {
                Some(language) => println!("{}", language),
                None => println!("Language could not be detected."),
            }
        }

        Command::Ask { question } => {
            let credential = app.session.credential();
            let answer = app
                .assistant()
                .legal_chatbot(&question, credential.as_ref())
                .await?;
            println!("{}", answer);
        }

        Command::Summarize {
            file,
            text_out,
            question,
        } => {
            let credential = app.session.credential();
            let assistant = app.assistant();
            let contents = std::fs::read(&file)?;
            let summary = assistant
                .summarize_document(&file_name_of(&file), contents, credential.as_ref())
                .await?;
            println!("{}", summary.summary);

            if let Some(path) = text_out {
                std::fs::write(&path, &summary.document_text)?;
                println!();
                println!("Document text saved to {}", path.display());
            }
            if let Some(question) = question {
                let answer = assistant
                    .ask_document(&summary.document_text, &question, credential.as_ref())
                    .await?;
                println!();
                println!("{}", answer);
            }
        }

        Command::AskDocument { document, question } => {
            let credential = app.session.credential();
            let document_text = std::fs::read_to_string(&document)?;
            let answer = app
                .assistant()
                .ask_document(&document_text, &question, credential.as_ref())
                .await?;
            println!("{}", answer);
        }

        Command::Version => print_version(),
    }

    Ok(())
}

fn log_failure(err: NyayaError, operation: &str, principal_id: u64) -> NyayaError {
    err.log_with_context(&ErrorContext::new(operation).with_principal_id(principal_id));
    err
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}

fn print_version() {
    println!("nyayasathi {}", env!("CARGO_PKG_VERSION"));
    println!("  commit: {}", option_env!("GIT_COMMIT").unwrap_or("unknown"));
    println!("  built:  {}", option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"));
}
