use std::sync::Arc;

use anyhow::Result;

use bazaar_clients::{R2Client, RazorpayClient};
use bazaar_common::ModuleClient;
use bazaar_database::MongoDbClient;
use bazaar_marketplace::store::{
    ensure_indexes, ListingStore, MongoListingStore, MongoQuotaStore, MongoReportStore, ObjectStore,
    QuotaStore, R2ObjectStore, RazorpayGateway, ReportStore,
};
use bazaar_marketplace::{ImageIngestor, ListingService, PaymentService, QuotaLedger, QuotaPolicy, UpiVerifier};

use crate::env::ApiServerEnv;

#[derive(Clone)]
pub struct GlobalState {
    pub listings: ListingService,
    pub payments: PaymentService,
    pub upi: Arc<UpiVerifier>,
    pub secret_salt: String,
}

impl GlobalState {
    pub async fn new(env: &ApiServerEnv) -> Result<Self> {
        let mongo = MongoDbClient::setup_connection().await?;
        let db = mongo.get_client().as_ref().clone();
        ensure_indexes(&db).await?;

        let r2 = R2Client::setup_connection().await?;
        let razorpay = RazorpayClient::setup_connection().await?;
        let gateway = RazorpayGateway::new(razorpay);

        let policy = QuotaPolicy::default();
        let payments = PaymentService::new(
            Arc::new(gateway.clone()),
            gateway.key_secret(),
            policy.currency.clone(),
        );

        Ok(Self::from_parts(
            Arc::new(MongoListingStore::new(db.clone())),
            Arc::new(MongoQuotaStore::new(db.clone())),
            Arc::new(MongoReportStore::new(db)),
            Arc::new(R2ObjectStore::new(r2)),
            payments,
            policy,
            env.secret_salt.clone(),
        ))
    }

    /// Wires the services over the given stores.
    pub fn from_parts(
        listings: Arc<dyn ListingStore>,
        quotas: Arc<dyn QuotaStore>,
        reports: Arc<dyn ReportStore>,
        objects: Arc<dyn ObjectStore>,
        payments: PaymentService,
        policy: QuotaPolicy,
        secret_salt: String,
    ) -> Self {
        let ledger = QuotaLedger::new(quotas, payments.clone(), policy);
        let listings = ListingService::new(listings, reports, ImageIngestor::new(objects), ledger);

        Self {
            listings,
            payments,
            upi: Arc::new(UpiVerifier::new()),
            secret_salt,
        }
    }
}
