mod bootstrap;

use std::process::ExitCode;

use anyhow::Result;
use serde::Serialize;
use tracker_core::models::{
    CreateSubscriptionRequest, ListSubscriptionsRequest, SortField, SubscriptionPage,
    SubscriptionResponse, SummaryRequest, UpdateSubscriptionRequest,
};
use tracker_core::month_year::TimezoneHandler;
use tracker_core::settings::{Command, ListArgs, Settings};
use tracker_core::validation::{validate_subscription_id, validate_user_id};
use tracker_core::TrackerError;
use tracker_data::service::SubscriptionService;
use tracker_data::store::JsonlStore;

fn main() -> ExitCode {
    let settings = Settings::load();
    let data_dir = settings.resolved_data_dir();

    if let Err(e) = bootstrap::ensure_directories(&data_dir)
        .and_then(|_| bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref()))
    {
        eprintln!("error: {e:#}");
        return ExitCode::FAILURE;
    }

    tracing::info!("Subs Tracker v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!(
        "Data dir: {}, Timezone: {}",
        data_dir.display(),
        settings.timezone
    );

    match run(settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            let invalid_input = e
                .downcast_ref::<TrackerError>()
                .is_some_and(TrackerError::is_validation);
            if invalid_input {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(settings: Settings) -> Result<()> {
    settings.validate()?;
    let store = JsonlStore::open(settings.resolved_data_dir())?;
    let timezone = TimezoneHandler::new(&settings.timezone);
    let mut service = SubscriptionService::new(store, timezone);

    match settings.command {
        Command::Add(args) => {
            let sub = service.create(&CreateSubscriptionRequest {
                service_name: args.service_name,
                price: args.price,
                user_id: args.user_id,
                start_date: args.start_date,
                end_date: args.end_date,
            })?;
            print_json(&SubscriptionResponse::from(&sub))?;
        }

        Command::Get { id } => {
            let sub = service.get(validate_subscription_id(&id)?)?;
            print_json(&SubscriptionResponse::from(&sub))?;
        }

        Command::List(args) => {
            let request = list_request(args)?;
            let (total, subs) = service.list(&request)?;
            print_json(&SubscriptionPage {
                total,
                items: subs.iter().map(SubscriptionResponse::from).collect(),
            })?;
        }

        Command::Update(args) => {
            let id = validate_subscription_id(&args.id)?;
            let sub = service.update(
                id,
                &UpdateSubscriptionRequest {
                    service_name: args.service_name,
                    price: args.price,
                    start_date: args.start_date,
                    end_date: args.end_date,
                },
            )?;
            print_json(&SubscriptionResponse::from(&sub))?;
        }

        Command::Delete { id } => {
            let id = validate_subscription_id(&id)?;
            service.delete(id)?;
            print_json(&serde_json::json!({ "message": "subscription deleted", "id": id }))?;
        }

        Command::Summary(args) => {
            let request = SummaryRequest {
                user_id: args.user_id,
                service_name: args.service_name,
                from: args.from,
                to: args.to,
            };
            let report = service.report(&request, args.breakdown)?;
            print_json(&report)?;
        }
    }

    Ok(())
}

/// Turn raw `list` arguments into a validated listing request.
fn list_request(args: ListArgs) -> Result<ListSubscriptionsRequest> {
    let user_id = match args.user_id.as_deref().filter(|v| !v.is_empty()) {
        Some(value) => Some(validate_user_id(value)?),
        None => None,
    };
    Ok(ListSubscriptionsRequest {
        user_id,
        service_name: args.service_name.filter(|v| !v.is_empty()),
        limit: args.limit,
        offset: args.offset,
        sort_by: args.sort_by.parse::<SortField>()?,
        descending: args.desc,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
