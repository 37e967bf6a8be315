use chrono::{Duration, Utc};
use clap::Args;
use rentsite::error::AppError;
use rentsite::rentals::{
    ApprovalDecision, ApprovalOutcome, BusinessProfile, Clock, ManualClock, RentalLifecycleService,
    RentalRepository, RentalSubmission,
};
use rentsite::store::MemoryStore;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Business shown on the demo microsite
    #[arg(long, default_value = "Panadería Sol")]
    pub(crate) business: String,
    /// Purchased term, e.g. "1 week", "1 mes", "3 months"
    #[arg(long, default_value = "1 week")]
    pub(crate) duration: String,
    /// Also submit and reject a second request
    #[arg(long)]
    pub(crate) include_rejection: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        business,
        duration,
        include_rejection,
    } = args;

    let clock = ManualClock::starting_at(Utc::now());
    let store = Arc::new(MemoryStore::new());
    let service = RentalLifecycleService::new(store.clone(), Arc::new(clock.clone()));

    println!("Rental microsite demo");
    let request = match service.submit(demo_submission(&business, &duration)).await {
        Ok(request) => request,
        Err(err) => {
            println!("  Submission failed: {}", err);
            return Ok(());
        }
    };
    println!(
        "- Received request {} for {} -> {} {}(s) at {}",
        request.id,
        request.business_name,
        request.duration_value,
        request.duration_type.label(),
        request.price
    );
    println!("  Reserved slug: {}", request.unique_slug);

    let decision = ApprovalDecision { approved: true };
    let rental = match service.approve(&request.id, decision).await {
        Ok(ApprovalOutcome::Approved { rental, .. }) => rental,
        Ok(ApprovalOutcome::Rejected { .. }) => {
            println!("  Request was rejected");
            return Ok(());
        }
        Err(err) => {
            println!("  Approval failed: {}", err);
            return Ok(());
        }
    };
    println!(
        "- Approved; site live at {} until {}",
        rental.slug.public_path(),
        rental.expiration_date.format("%Y-%m-%d %H:%M UTC")
    );

    match service.approve(&request.id, decision).await {
        Ok(_) => println!("  Unexpected: second approval succeeded"),
        Err(err) => println!("  Second approval refused: {}", err),
    }

    match service.resolve_slug(&rental.slug).await {
        Ok(view) => println!(
            "- Visitor sees {} ({} services, theme {})",
            view.business_name,
            view.business_data.services.len(),
            view.business_data.theme
        ),
        Err(err) => println!("  Lookup failed: {}", err),
    }

    if include_rejection {
        println!("{}", decline_request(&service).await);
    }

    let lapse = rental.expiration_date - clock.now() + Duration::seconds(1);
    clock.advance(lapse);
    println!(
        "\nClock advanced to {}",
        clock.now().format("%Y-%m-%d %H:%M UTC")
    );
    match service.resolve_slug(&rental.slug).await {
        Ok(_) => println!("  Unexpected: expired site still served"),
        Err(err) => println!("- Visitor now gets: {}", err),
    }
    println!("- Rentals left after sweep: {}", store.rentals().await.len());

    Ok(())
}

/// Submit and reject a second request, describing the outcome or the failure.
async fn decline_request<R>(service: &RentalLifecycleService<R>) -> String
where
    R: RentalRepository + 'static,
{
    let declined = match service
        .submit(demo_submission("Declined Ventures", "1 month"))
        .await
    {
        Ok(declined) => declined,
        Err(err) => return format!("  Submission failed: {}", err),
    };

    match service
        .approve(&declined.id, ApprovalDecision { approved: false })
        .await
    {
        Ok(outcome) => format!(
            "- Request {} for {} -> {}",
            declined.id,
            declined.business_name,
            outcome.request().status
        ),
        Err(err) => format!("  Rejection failed: {}", err),
    }
}

fn demo_submission(business: &str, duration: &str) -> RentalSubmission {
    let mut social_links = BTreeMap::new();
    social_links.insert(
        "instagram".to_string(),
        "https://instagram.com/panaderiasol".to_string(),
    );
    RentalSubmission {
        business_name: business.to_string(),
        contact_email: "owner@example.com".to_string(),
        contact_phone: "555-0101".to_string(),
        duration: duration.to_string(),
        business_data: BusinessProfile {
            description: "Fresh bread and pastries baked every morning".to_string(),
            services: vec![
                "Catering".to_string(),
                "Custom cakes".to_string(),
                "Wholesale".to_string(),
            ],
            social_links,
            ..BusinessProfile::default()
        },
    }
}
