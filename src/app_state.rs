use std::sync::Arc;

use crate::{
    config::Config,
    database::Database,
    infrastructure::{
        billing::{BillingProvider, StripeClient},
        media::{media_store_from_config, MediaStore},
        security::TokenService,
        sms::{OtpVerifier, TwilioVerifyClient},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub tokens: Arc<TokenService>,
    pub config: Arc<Config>,
    pub media: Arc<dyn MediaStore>,
    pub otp: Arc<dyn OtpVerifier>,
    pub billing: Arc<dyn BillingProvider>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db = Database::connect(&config.database, config.server.node_id).await?;
        let media = media_store_from_config(&config.media);
        let otp: Arc<dyn OtpVerifier> = Arc::new(TwilioVerifyClient::new(&config.sms));
        let billing: Arc<dyn BillingProvider> = Arc::new(StripeClient::new(&config.billing));
        Ok(Self::with_services(config, db, media, otp, billing))
    }

    /// Assemble state around already-built collaborators; tests plug fakes in here.
    pub fn with_services(
        config: Config,
        db: Database,
        media: Arc<dyn MediaStore>,
        otp: Arc<dyn OtpVerifier>,
        billing: Arc<dyn BillingProvider>,
    ) -> Self {
        Self {
            db: Arc::new(db),
            tokens: Arc::new(TokenService::new(&config.auth)),
            config: Arc::new(config),
            media,
            otp,
            billing,
        }
    }
}
