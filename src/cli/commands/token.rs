use anyhow::Context;
use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::auth::issue_token;
use crate::cli::{utils::output_success, OutputFormat};
use crate::config::config;

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[arg(long, help = "User id to put in the user_id claim")]
    pub user: Uuid,

    #[arg(long, help = "Display name claim")]
    pub name: Option<String>,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = &config().security;
    let token = issue_token(args.user, args.name, security).context("failed to sign token")?;

    output_success(
        output_format,
        "Token issued",
        Some(json!({
            "user_id": args.user,
            "expires_in_hours": security.jwt_expiry_hours,
            "token": token,
        })),
    )
}
