use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lis_api::{ApiClient, ClientConfig, SessionStore};
use lis_core::{
    available_actions, filter_patients, Backend, DashboardStats, LabError, NewPatient,
    NewProtocol, OrderAction, OrderDraft, ResultEntry, ResultValue, StatusFilter,
    WorklistService,
};
use lis_report::{Document, Element, ReportBody};
use lis_types::{NonEmptyText, ProtocolCode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lis")]
#[command(about = "Clinical laboratory client CLI")]
struct Cli {
    /// Backend base URL. Falls back to the LIS_API_URL environment variable.
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session token
    Login {
        username: String,
        password: String,
    },
    /// Discard the stored session
    Logout,
    /// Headline counts: registered patients, today's orders, pending orders
    Dashboard,
    /// Patient registry
    #[command(subcommand)]
    Patients(PatientCommands),
    /// Study protocol management
    #[command(subcommand)]
    Protocols(ProtocolCommands),
    /// Compose and submit a new order
    Order {
        /// Patient id
        #[arg(long)]
        patient: String,
        /// Study protocol code (repeatable)
        #[arg(long = "study", required = true)]
        studies: Vec<String>,
        /// Insurer on the order (defaults to the patient's)
        #[arg(long)]
        insurer: Option<String>,
        /// Insurer authorisation number
        #[arg(long)]
        auth_number: Option<String>,
        /// Mark the order as authorised
        #[arg(long)]
        authorized: bool,
    },
    /// The day's order list
    #[command(subcommand)]
    Worklist(WorklistCommands),
    /// Enter and submit results for an order
    Results {
        order_id: String,
        /// JSON object: protocol id to field values, e.g.
        /// '{"pr1": {"hb": 14.2, "observations": "ok"}}'
        #[arg(long)]
        values: String,
        /// Comments shared by every result of the order
        #[arg(long)]
        comments: Option<String>,
    },
    /// Result reports
    #[command(subcommand)]
    Report(ReportCommands),
}

#[derive(Subcommand)]
enum PatientCommands {
    /// List patients, optionally filtered by name or DNI
    List {
        #[arg(long)]
        search: Option<String>,
    },
    /// Register a patient
    Add {
        first_name: String,
        last_name: String,
        dni: String,
        /// Date of birth (YYYY-MM-DD)
        dob: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        insurer: Option<String>,
    },
    /// Show one patient
    Show { id: String },
}

#[derive(Subcommand)]
enum ProtocolCommands {
    /// List study protocols
    List,
    /// Create a protocol from a JSON field list
    Add {
        name: String,
        code: String,
        /// JSON array of field definitions
        #[arg(long)]
        fields: String,
    },
    /// Replace a protocol's definition
    Update {
        id: String,
        name: String,
        code: String,
        /// JSON array of field definitions
        #[arg(long)]
        fields: String,
    },
    /// Delete a protocol. Existing orders keep their study snapshots.
    Delete { id: String },
}

#[derive(Subcommand)]
enum WorklistCommands {
    /// List orders (pending | in-process | completed | all)
    List {
        #[arg(long, default_value = "all")]
        status: String,
    },
    /// Move a pending order into process
    Start { order_id: String },
    /// Toggle the sample-taken flag on an order
    Sample { order_id: String },
}

#[derive(Subcommand)]
enum ReportCommands {
    /// Print the report for a completed order
    Show { order_id: String },
    /// Write the paginated report to a text file
    Export {
        order_id: String,
        #[arg(long)]
        out: PathBuf,
    },
    /// Ask the backend to generate the printable report
    Generate { order_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("lis=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let env_url = cli.api_url.clone().or_else(|| std::env::var("LIS_API_URL").ok());
    let config = ClientConfig::from_env_value(env_url)?;
    let client = ApiClient::new(config, SessionStore::open());

    match cli.command {
        Commands::Login { username, password } => {
            let response = client.login(&username, &password).await?;
            println!("Signed in as {}", response.user.username);
        }
        Commands::Logout => {
            client.logout().await;
            println!("Signed out");
        }
        Commands::Dashboard => {
            let patients = client.list_patients(None).await?;
            let orders = client.list_orders().await?;
            let stats =
                DashboardStats::derive(&patients, &orders, chrono::Utc::now().date_naive());
            println!("Patients: {}", stats.total_patients);
            println!("Orders today: {}", stats.orders_today);
            println!("Pending orders: {}", stats.pending_orders);
        }
        Commands::Patients(command) => run_patients(&client, command).await?,
        Commands::Protocols(command) => run_protocols(&client, command).await?,
        Commands::Order {
            patient,
            studies,
            insurer,
            auth_number,
            authorized,
        } => run_order(&client, &patient, &studies, insurer, auth_number, authorized).await?,
        Commands::Worklist(command) => run_worklist(&client, command).await?,
        Commands::Results {
            order_id,
            values,
            comments,
        } => run_results(&client, &order_id, &values, comments).await?,
        Commands::Report(command) => run_report(&client, command).await?,
    }

    Ok(())
}

async fn run_patients(client: &ApiClient, command: PatientCommands) -> anyhow::Result<()> {
    match command {
        PatientCommands::List { search } => {
            let patients = client.list_patients(None).await?;
            let query = search.unwrap_or_default();
            let shown = filter_patients(&patients, &query);
            if shown.is_empty() {
                println!("No patients found.");
            }
            for patient in shown {
                println!(
                    "{}  {}  DNI {}  born {}",
                    patient.id,
                    patient.full_name(),
                    patient.dni,
                    patient.dob
                );
            }
        }
        PatientCommands::Add {
            first_name,
            last_name,
            dni,
            dob,
            phone,
            insurer,
        } => {
            let new = NewPatient {
                first_name,
                last_name,
                dni,
                dob,
                phone,
                insurer,
            };
            new.validate()?;
            let patient = client.create_patient(&new).await?;
            println!("Registered {} with id {}", patient.full_name(), patient.id);
        }
        PatientCommands::Show { id } => {
            let patient = client.get_patient(&id).await?;
            println!("Name: {}", patient.full_name());
            println!("DNI: {}", patient.dni);
            println!("Born: {}", patient.dob);
            if let Some(phone) = &patient.phone {
                println!("Phone: {}", phone);
            }
            if let Some(insurer) = &patient.insurer {
                println!("Insurer: {}", insurer);
            }
        }
    }
    Ok(())
}

async fn run_protocols(client: &ApiClient, command: ProtocolCommands) -> anyhow::Result<()> {
    match command {
        ProtocolCommands::List => {
            for protocol in client.list_protocols().await? {
                println!(
                    "{}  {} ({})  {} fields",
                    protocol.id,
                    protocol.name,
                    protocol.code,
                    protocol.fields.len()
                );
            }
        }
        ProtocolCommands::Add { name, code, fields } => {
            let protocol = client
                .create_protocol(&NewProtocol {
                    name: NonEmptyText::new(name)?,
                    code: ProtocolCode::new(code)?,
                    fields: serde_json::from_str(&fields)?,
                })
                .await?;
            println!("Created protocol {} with id {}", protocol.code, protocol.id);
        }
        ProtocolCommands::Update {
            id,
            name,
            code,
            fields,
        } => {
            let protocol = client
                .update_protocol(
                    &id,
                    &NewProtocol {
                        name: NonEmptyText::new(name)?,
                        code: ProtocolCode::new(code)?,
                        fields: serde_json::from_str(&fields)?,
                    },
                )
                .await?;
            println!("Updated protocol {}", protocol.id);
        }
        ProtocolCommands::Delete { id } => {
            client.delete_protocol(&id).await?;
            println!("Deleted protocol {}", id);
        }
    }
    Ok(())
}

async fn run_order(
    client: &ApiClient,
    patient_id: &str,
    study_codes: &[String],
    insurer: Option<String>,
    auth_number: Option<String>,
    authorized: bool,
) -> anyhow::Result<()> {
    let patient = client.get_patient(patient_id).await?;
    let protocols = client.list_protocols().await?;

    let mut draft = OrderDraft::new();
    draft.select_patient(patient);
    for code in study_codes {
        let protocol = protocols
            .iter()
            .find(|p| p.code.matches(code))
            .ok_or_else(|| anyhow::anyhow!("no protocol with code '{}'", code))?;
        draft.add_study(protocol);
    }
    if insurer.is_some() {
        draft.insurer = insurer;
    }
    draft.auth_number = auth_number;
    draft.authorized = authorized;

    let order = draft.submit(client).await?;
    println!(
        "Created order {} for {} ({})",
        order.id,
        order.patient.full_name(),
        order.study_names()
    );
    Ok(())
}

async fn run_worklist(client: &ApiClient, command: WorklistCommands) -> anyhow::Result<()> {
    let service = WorklistService::new(client);
    match command {
        WorklistCommands::List { status } => {
            let filter: StatusFilter = status.parse()?;
            let orders = service.refresh().await?;
            let shown = lis_core::worklist::filter(&orders, filter);
            if shown.is_empty() {
                println!("No orders.");
            }
            for order in shown {
                let actions = available_actions(order)
                    .iter()
                    .map(action_label)
                    .collect::<Vec<_>>()
                    .join(", ");
                println!(
                    "{}  {}  [{}]  sample: {}  {}  ({})",
                    order.id,
                    order.patient.full_name(),
                    order.status,
                    if order.sample_taken { "taken" } else { "pending" },
                    order.study_names(),
                    actions
                );
            }
        }
        WorklistCommands::Start { order_id } => {
            let order = client.get_order(&order_id).await?;
            service.start(&order).await?;
            println!("Order {} is now in process", order_id);
        }
        WorklistCommands::Sample { order_id } => {
            let order = client.get_order(&order_id).await?;
            service.toggle_sample(&order).await?;
            println!(
                "Order {} sample marked {}",
                order_id,
                if order.sample_taken { "pending" } else { "taken" }
            );
        }
    }
    Ok(())
}

fn action_label(action: &OrderAction) -> &'static str {
    match action {
        OrderAction::Start => "start",
        OrderAction::EnterResults => "enter results",
        OrderAction::ViewReport => "view report",
    }
}

async fn run_results(
    client: &ApiClient,
    order_id: &str,
    values_json: &str,
    comments: Option<String>,
) -> anyhow::Result<()> {
    let order = client.get_order(order_id).await?;
    let protocols = client.list_protocols().await?;
    let values: BTreeMap<String, BTreeMap<String, ResultValue>> =
        serde_json::from_str(values_json)?;

    let mut entry = ResultEntry::new(&order);
    for (protocol_id, fields) in values {
        let protocol = protocols
            .iter()
            .find(|p| p.id == protocol_id)
            .ok_or(LabError::NotFound {
                kind: "protocol",
                id: protocol_id.clone(),
            })?;
        for (key, value) in fields {
            // Entered values must fit the field's declared kind before
            // anything is recorded or sent.
            let field = protocol
                .fields
                .iter()
                .find(|f| f.key == key)
                .ok_or(LabError::NotFound {
                    kind: "field",
                    id: key.clone(),
                })?;
            field.validate_entry(&value)?;
            entry.set_value(&protocol_id, &key, value)?;
        }
    }
    if let Some(comments) = comments {
        entry.set_comments(comments);
    }

    let order = entry.submit(client).await?;
    println!("Results recorded; order {} is {}", order.id, order.status);
    Ok(())
}

async fn run_report(client: &ApiClient, command: ReportCommands) -> anyhow::Result<()> {
    match command {
        ReportCommands::Show { order_id } => {
            let body = fetch_report_body(client, &order_id).await?;
            print!("{}", lis_report::render_text(&body));
        }
        ReportCommands::Export { order_id, out } => {
            let body = fetch_report_body(client, &order_id).await?;
            let document = Document::layout(&body);
            std::fs::write(&out, render_document(&document))?;
            println!(
                "Wrote {} page(s) to {}",
                document.pages.len(),
                out.display()
            );
        }
        ReportCommands::Generate { order_id } => {
            let response = client.generate_report(&order_id).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }
    Ok(())
}

async fn fetch_report_body(client: &ApiClient, order_id: &str) -> anyhow::Result<ReportBody> {
    let order = client.get_order(order_id).await?;
    let results = client.results_for_order(order_id).await?;
    let protocols = client.list_protocols().await?;
    Ok(ReportBody::build(&order, &results, &protocols)?)
}

/// Renders a laid-out document as plain text, one form feed per page break.
fn render_document(document: &Document) -> String {
    let mut out = String::new();
    let total = document.pages.len();
    for (index, page) in document.pages.iter().enumerate() {
        for placed in &page.elements {
            match &placed.element {
                Element::Title(text) => {
                    out.push_str(text);
                    out.push('\n');
                }
                Element::HeaderLine(text) | Element::ObservationLine(text) => {
                    out.push_str(text);
                    out.push('\n');
                }
                Element::SectionTitle(text) => {
                    out.push('\n');
                    out.push_str(text);
                    out.push('\n');
                }
                Element::TableHead => {
                    out.push_str(&format!(
                        "{:<28} {:<18} {}\n",
                        "Parameter", "Value", "Reference"
                    ));
                }
                Element::Row(row) => {
                    let value = match row.flag {
                        Some(flag) => format!("{} {}", row.value, flag.marker()),
                        None => row.value.clone(),
                    };
                    out.push_str(&format!(
                        "{:<28} {:<18} {}\n",
                        row.label, value, row.reference
                    ));
                }
            }
        }
        out.push('\n');
        out.push_str(&page.footer);
        out.push('\n');
        if index + 1 < total {
            out.push('\u{c}');
        }
    }
    out
}
