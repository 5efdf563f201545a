use std::sync::Arc;

use bazaar_marketplace::store::{
    MemoryListingStore, MemoryObjectStore, MemoryPaymentGateway, MemoryQuotaStore, MemoryReportStore,
    ObjectStore, QuotaStore,
};
use bazaar_marketplace::{
    object_id_from_url, CreateListingInput, ImageIngestor, ListingCategory, ListingFilter, ListingOwner,
    ListingService, ListingStatus, MarketError, PaymentService, PaymentVerificationRequest, PriceInput,
    QuotaLedger, QuotaPolicy, ReportReason, ReportRequest, CAPTURED_STATUS,
};

const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";
const GATEWAY_SECRET: &str = "workflow_secret";

struct Harness {
    service: ListingService,
    payments: PaymentService,
    listings: Arc<MemoryListingStore>,
    objects: Arc<MemoryObjectStore>,
    quotas: Arc<MemoryQuotaStore>,
    gateway: Arc<MemoryPaymentGateway>,
    reports: Arc<MemoryReportStore>,
}

impl Harness {
    fn new() -> Self {
        let listings = Arc::new(MemoryListingStore::default());
        let objects = Arc::new(MemoryObjectStore::default());
        let quotas = Arc::new(MemoryQuotaStore::default());
        let gateway = Arc::new(MemoryPaymentGateway::new("rzp_test_key"));
        let reports = Arc::new(MemoryReportStore::default());

        let payments = PaymentService::new(gateway.clone(), GATEWAY_SECRET, "INR");
        let ledger = QuotaLedger::new(quotas.clone(), payments.clone(), QuotaPolicy::default());
        let service = ListingService::new(
            listings.clone(),
            reports.clone(),
            ImageIngestor::new(objects.clone()),
            ledger,
        );

        Self { service, payments, listings, objects, quotas, gateway, reports }
    }

    fn signed_payment(&self, order_id: &str, payment_id: &str) -> PaymentVerificationRequest {
        PaymentVerificationRequest {
            order_id: order_id.to_string(),
            payment_id: payment_id.to_string(),
            signature: self.payments.expected_signature(order_id, payment_id),
        }
    }
}

fn owner(user_id: &str) -> ListingOwner {
    ListingOwner {
        user_id: user_id.to_string(),
        display_name: Some("Asha".to_string()),
        email: Some(format!("{user_id}@example.com")),
    }
}

fn input_with_images(images: usize) -> CreateListingInput {
    CreateListingInput {
        title: "Wooden study table".to_string(),
        description: "Solid teak, minor scratches on one leg, must pick up.".to_string(),
        price: Some(PriceInput::Number(2500.0)),
        category: "Home & Garden".to_string(),
        phone_number: "98765-43210".to_string(),
        tags: vec!["furniture".to_string()],
        location_address: "4th Cross, Jayanagar".to_string(),
        location_city: "Bengaluru".to_string(),
        coordinates: None,
        images: vec![PNG.to_string(); images],
        payment: None,
    }
}

fn input() -> CreateListingInput {
    input_with_images(1)
}

#[tokio::test]
async fn created_listing_is_normalized_and_owned() {
    let h = Harness::new();
    let listing = h
        .service
        .create(&ListingOwner { user_id: "u1".into(), display_name: None, email: None }, input_with_images(2))
        .await
        .unwrap();

    assert_eq!(listing.id.len(), 24);
    assert_eq!(listing.phone_number, "+919876543210");
    assert_eq!(listing.category, ListingCategory::HomeAndGarden);
    assert_eq!(listing.user_name, "Anonymous User");
    assert_eq!(listing.user_email, "No Email Provided");
    assert_eq!(listing.status, ListingStatus::Active);
    assert!(!listing.is_paid);
    assert_eq!(listing.images.len(), 2);

    let object_id = object_id_from_url(&listing.images[0]).unwrap();
    let stored = h.service.images().fetch(object_id).await.unwrap().unwrap();
    assert_eq!(stored.content_type, "image/png");

    let fetched = h.service.get_by_id(&listing.id).await.unwrap().unwrap();
    assert_eq!(fetched, listing);
}

#[tokio::test]
async fn free_quota_then_payment_required_then_paid() {
    let h = Harness::new();
    let user = owner("u1");

    h.service.create(&user, input()).await.unwrap();
    assert_eq!(h.quotas.get_or_create("u1").await.unwrap().free_listings_count, 1);
    h.service.create(&user, input()).await.unwrap();
    assert_eq!(h.quotas.get_or_create("u1").await.unwrap().free_listings_count, 2);

    let err = h.service.create(&user, input()).await.unwrap_err();
    assert!(matches!(err, MarketError::QuotaExceeded { fee: 5 }));
    // Rejected before any upload.
    assert_eq!(h.objects.put_attempts(), 2);

    h.gateway.add_payment("order_1", "pay_1", 500, CAPTURED_STATUS);
    let mut paid = input();
    paid.payment = Some(h.signed_payment("order_1", "pay_1"));
    let listing = h.service.create(&user, paid).await.unwrap();
    assert!(listing.is_paid);
    assert_eq!(listing.payment_id.as_deref(), Some("pay_1"));

    let quota = h.quotas.get_or_create("u1").await.unwrap();
    assert_eq!(quota.free_listings_count, 2);
    assert_eq!(quota.paid_listings_count, 1);
    assert_eq!(quota.total_paid_amount, 5);

    let status = h.service.quota().status("u1").await.unwrap();
    assert!(status.needs_payment);
    assert_eq!(status.paid_count, 1);
}

#[tokio::test]
async fn reused_payment_does_not_unlock_second_listing() {
    let h = Harness::new();
    h.gateway.add_payment("order_1", "pay_1", 500, CAPTURED_STATUS);

    let mut paid = input();
    paid.payment = Some(h.signed_payment("order_1", "pay_1"));
    h.service.create(&owner("u1"), paid.clone()).await.unwrap();

    let err = h.service.create(&owner("u1"), paid).await.unwrap_err();
    assert!(matches!(err, MarketError::PaymentAlreadyUsed(_)));
    assert_eq!(h.listings.len(), 1);
    assert_eq!(h.objects.len(), 1);
}

#[tokio::test]
async fn uncaptured_payment_rolls_back_uploaded_images() {
    let h = Harness::new();
    h.gateway.add_payment("order_1", "pay_1", 500, "authorized");

    let mut paid = input_with_images(3);
    paid.payment = Some(h.signed_payment("order_1", "pay_1"));
    let err = h.service.create(&owner("u1"), paid.clone()).await.unwrap_err();
    assert!(matches!(err, MarketError::PaymentNotCaptured));
    assert_eq!(h.objects.put_attempts(), 3);
    assert!(h.objects.is_empty());
    assert!(h.listings.is_empty());

    h.gateway.set_status("pay_1", CAPTURED_STATUS);
    assert!(h.service.create(&owner("u1"), paid).await.unwrap().is_paid);
}

#[tokio::test]
async fn oversized_image_is_rejected_before_any_write() {
    let h = Harness::new();
    let mut too_big = input();
    too_big.images = vec![format!("data:image/jpeg;base64,{}", "A".repeat(7_000_000))];

    let err = h.service.create(&owner("u1"), too_big).await.unwrap_err();
    match err {
        MarketError::Validation(errors) => assert_eq!(errors.field_names(), vec!["images"]),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(h.objects.put_attempts(), 0);
    assert_eq!(h.quotas.get_or_create("u1").await.unwrap().free_listings_count, 0);
}

#[tokio::test]
async fn image_batch_size_bounds() {
    let objects = Arc::new(MemoryObjectStore::default());
    let ingestor = ImageIngestor::new(objects.clone());

    for count in [0, 6] {
        let batch = vec![PNG.to_string(); count];
        assert!(matches!(ingestor.ingest(&batch).await, Err(MarketError::InvalidImage(_))));
    }
    assert_eq!(objects.put_attempts(), 0);

    for count in 1..=5 {
        let urls = ingestor.ingest(&vec![PNG.to_string(); count]).await.unwrap();
        assert_eq!(urls.len(), count);
    }
    assert_eq!(objects.len(), 15);
}

#[tokio::test]
async fn failed_upload_removes_earlier_images_and_keeps_quota() {
    let h = Harness::new();
    h.objects.fail_upload_number(3);

    let err = h.service.create(&owner("u1"), input_with_images(4)).await.unwrap_err();
    assert!(matches!(err, MarketError::Dependency(_)));
    assert_eq!(h.objects.put_attempts(), 3);
    assert!(h.objects.is_empty());
    assert_eq!(h.quotas.get_or_create("u1").await.unwrap().free_listings_count, 0);
}

#[tokio::test]
async fn failed_persist_removes_images_but_keeps_consumed_slot() {
    let h = Harness::new();
    h.listings.fail_inserts(true);

    let err = h.service.create(&owner("u1"), input_with_images(2)).await.unwrap_err();
    assert!(matches!(err, MarketError::Dependency(_)));
    assert!(h.objects.is_empty());
    assert_eq!(h.quotas.get_or_create("u1").await.unwrap().free_listings_count, 1);
}

#[tokio::test]
async fn pagination_reports_has_more() {
    let h = Harness::new();
    for i in 0..10 {
        let mut listing = input();
        listing.title = format!("Wooden study table {i}");
        h.service.create(&owner(&format!("u{i}")), listing).await.unwrap();
    }

    let first = h.service.list(&ListingFilter::default(), Some(1), Some(8)).await.unwrap();
    assert_eq!(first.listings.len(), 8);
    assert!(first.has_more);
    assert_eq!(first.listings[0].title, "Wooden study table 9");

    let second = h.service.list(&ListingFilter::default(), Some(2), Some(8)).await.unwrap();
    assert_eq!(second.listings.len(), 2);
    assert!(!second.has_more);
    assert_eq!(second.listings[1].title, "Wooden study table 0");

    let defaults = h.service.list(&ListingFilter::default(), None, None).await.unwrap();
    assert_eq!((defaults.page, defaults.page_size), (1, 8));
}

#[tokio::test]
async fn pages_past_the_end_are_empty() {
    let h = Harness::new();
    h.service.create(&owner("u1"), input()).await.unwrap();

    for page in [2, i64::MAX as u64, u64::MAX] {
        let result = h.service.list(&ListingFilter::default(), Some(page), Some(50)).await.unwrap();
        assert!(result.listings.is_empty());
        assert!(!result.has_more);
        assert_eq!(result.page, page);
    }
}

#[tokio::test]
async fn list_filters_by_exact_match() {
    let h = Harness::new();
    h.service.create(&owner("u1"), input()).await.unwrap();

    let mut elsewhere = input();
    elsewhere.location_city = "Mysuru".to_string();
    elsewhere.category = "Electronics".to_string();
    h.service.create(&owner("u2"), elsewhere).await.unwrap();

    let by_city = ListingFilter { city: Some("Mysuru".into()), ..Default::default() };
    let page = h.service.list(&by_city, None, None).await.unwrap();
    assert_eq!(page.listings.len(), 1);
    assert_eq!(page.listings[0].user_id, "u2");

    let by_category = ListingFilter { category: Some(ListingCategory::HomeAndGarden), ..Default::default() };
    assert_eq!(h.service.list(&by_category, None, None).await.unwrap().listings[0].user_id, "u1");

    let by_user = ListingFilter { user_id: Some("nobody".into()), ..Default::default() };
    assert!(h.service.list(&by_user, None, None).await.unwrap().listings.is_empty());
}

#[tokio::test]
async fn get_by_id_distinguishes_absent_from_malformed() {
    let h = Harness::new();
    assert!(h.service.get_by_id("65f1c2a9e4b0a1b2c3d4e5f6").await.unwrap().is_none());
    assert!(matches!(h.service.get_by_id("not-an-id").await, Err(MarketError::InvalidId(_))));
}

#[tokio::test]
async fn delete_succeeds_when_one_image_cleanup_fails() {
    let h = Harness::new();
    let listing = h.service.create(&owner("u1"), input_with_images(3)).await.unwrap();
    let stuck = object_id_from_url(&listing.images[1]).unwrap().to_string();
    h.objects.fail_delete_of(&stuck);

    h.service.delete_owned(&listing.id, "u1").await.unwrap();

    assert!(h.service.get_by_id(&listing.id).await.unwrap().is_none());
    assert_eq!(h.objects.len(), 1);
    assert!(h.objects.contains(&stuck));
}

#[tokio::test]
async fn delete_checks_owner_and_existence() {
    let h = Harness::new();
    let listing = h.service.create(&owner("u1"), input()).await.unwrap();

    let err = h.service.delete_owned(&listing.id, "u2").await.unwrap_err();
    assert!(matches!(err, MarketError::Forbidden(_)));
    assert!(h.service.get_by_id(&listing.id).await.unwrap().is_some());

    assert!(matches!(
        h.service.delete("65f1c2a9e4b0a1b2c3d4e5f6").await,
        Err(MarketError::NotFound(_))
    ));
    assert!(matches!(h.service.delete("bad").await, Err(MarketError::InvalidId(_))));

    h.service.delete(&listing.id).await.unwrap();
    assert!(h.objects.is_empty());
}

#[tokio::test]
async fn third_report_puts_listing_under_review() {
    let h = Harness::new();
    let listing = h.service.create(&owner("u1"), input()).await.unwrap();

    for (i, reason) in [ReportReason::Spam, ReportReason::FakeListing, ReportReason::Other].into_iter().enumerate() {
        let report = h
            .service
            .report(&listing.id, &owner(&format!("r{i}")), ReportRequest { reason, description: String::new() })
            .await
            .unwrap();
        assert_eq!(report.listing_id, listing.id);

        let current = h.service.get_by_id(&listing.id).await.unwrap().unwrap();
        assert_eq!(current.report_count, i as i64 + 1);
        let expected = if i < 2 { ListingStatus::Active } else { ListingStatus::UnderReview };
        assert_eq!(current.status, expected);
    }

    assert_eq!(h.reports.reports().len(), 3);
    assert_eq!(h.reports.reports()[0].reported_by, "r0@example.com");

    let missing = h
        .service
        .report("65f1c2a9e4b0a1b2c3d4e5f6", &owner("r9"), ReportRequest { reason: ReportReason::Spam, description: String::new() })
        .await;
    assert!(matches!(missing, Err(MarketError::NotFound(_))));
    assert_eq!(h.reports.reports().len(), 3);
}

#[tokio::test]
async fn unknown_image_fetch_is_none() {
    let objects = Arc::new(MemoryObjectStore::default());
    assert!(objects.get("missing.png").await.unwrap().is_none());

    let ingestor = ImageIngestor::new(objects);
    assert!(ingestor.fetch("missing.png").await.unwrap().is_none());
    assert!(matches!(ingestor.fetch("../etc/passwd").await, Err(MarketError::InvalidId(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_free_creations_never_exceed_the_limit() {
    let h = Harness::new();
    let ledger = h.service.quota().clone();

    let attempts: Vec<_> = (0..20)
        .map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.consume("u1", None).await })
        })
        .collect();

    let mut granted = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(charge) => {
                assert!(!charge.is_paid());
                granted += 1;
            }
            Err(e) => assert!(matches!(e, MarketError::QuotaExceeded { fee: 5 })),
        }
    }

    assert_eq!(granted, QuotaPolicy::default().free_listings_limit);
    assert_eq!(h.quotas.get_or_create("u1").await.unwrap().free_listings_count, 2);
}
