use chrono::Utc;
use clap::Parser;
use gateway::webhook::{SIGNATURE_HEADER, sign_header};
use serde_json::json;

/// Sends a signed `checkout.session.completed` event to a running server.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Webhook signing secret shared with the server.
    #[arg(long, env = "STRIPE_WEBHOOK_SECRET")]
    secret: String,

    /// Donation in whole dollars.
    #[arg(long, default_value_t = 25)]
    amount: u64,

    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Payment intent id; reuse one to check duplicate handling.
    #[arg(long)]
    payment_intent: Option<String>,

    /// Print the body and signature header instead of sending.
    #[arg(long)]
    print_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let now = Utc::now();
    let suffix = now.timestamp_millis();
    let payment_intent = args
        .payment_intent
        .unwrap_or_else(|| format!("pi_tester_{suffix}"));

    let event = json!({
        "id": format!("evt_tester_{suffix}"),
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": format!("cs_tester_{suffix}"),
                "amount_total": args.amount * 100,
                "currency": "usd",
                "payment_intent": payment_intent,
                "payment_status": "paid",
            }
        }
    });

    let body = serde_json::to_vec(&event)?;
    let signature = sign_header(&args.secret, now.timestamp(), &body);

    if args.print_only {
        println!("{}", String::from_utf8_lossy(&body));
        println!("{SIGNATURE_HEADER}: {signature}");
        return Ok(());
    }

    let endpoint = format!("{}/api/stripe-webhook", args.url.trim_end_matches('/'));
    println!("Sending ${} donation ({payment_intent}) to {endpoint}", args.amount);

    let response = reqwest::Client::new()
        .post(&endpoint)
        .header(SIGNATURE_HEADER, signature)
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await?;

    println!("Status: {}", response.status());
    println!("{}", response.text().await?);

    Ok(())
}
