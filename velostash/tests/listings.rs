mod common;

use common::{NOW, bike, harness, rental};
use velostash::{BikeUpdate, GatewayError, ImageInput, NewBike, model::RentalStatus};

fn listing(name: &str, rate: f64) -> NewBike {
    NewBike {
        owner: "owner@x.io".to_string(),
        name: name.to_string(),
        category: "Road".to_string(),
        rate,
        location: "Pier".to_string(),
        available: true,
        ..NewBike::default()
    }
}

fn edit(rate: f64) -> BikeUpdate {
    BikeUpdate {
        name: " Trek 2 ".to_string(),
        category: String::new(),
        description: "Serviced".to_string(),
        rate,
        location: "Harbour".to_string(),
        available: false,
    }
}

#[tokio::test]
async fn test_unusable_rate_is_stored_as_zero() -> anyhow::Result<()> {
    let mut h = harness();

    h.gateway.post_bike(listing("A", 10.0), Vec::new()).await?;
    h.clock.advance(1);
    let broken = h.gateway.post_bike(listing("B", f64::NAN), Vec::new()).await?;
    assert_eq!(broken.rate, 0.0);
    h.clock.advance(1);
    h.gateway
        .post_bike(listing("C", f64::INFINITY), Vec::new())
        .await?;

    // Earlier listings stay readable after the bad ones.
    let names: Vec<String> = h.gateway.bikes().into_iter().map(|b| b.name).collect();
    assert_eq!(names, ["A", "B", "C"]);
    assert!(h.gateway.bikes().iter().all(|b| b.rate.is_finite()));
    Ok(())
}

#[tokio::test]
async fn test_listing_can_start_unavailable() -> anyhow::Result<()> {
    let mut h = harness();
    let hidden = NewBike {
        available: false,
        ..listing("A", 10.0)
    };

    let posted = h.gateway.post_bike(hidden, Vec::new()).await?;
    assert!(!posted.available);
    assert!(h.gateway.available_bikes().is_empty());
    assert_eq!(h.gateway.bikes_by_owner("OWNER@x.io").len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_owner_edits_listing() -> anyhow::Result<()> {
    let mut h = harness();
    let photo = ImageInput::new(b"junk".to_vec(), "image/webp");
    let posted = h.gateway.post_bike(listing("Trek", 40.0), vec![photo]).await?;

    let edited = h
        .gateway
        .update_bike(posted.id, "OWNER@x.io", edit(55.0), Vec::new())
        .await?;
    assert_eq!(edited.id, posted.id);
    assert_eq!(edited.owner, "owner@x.io");
    assert_eq!(edited.name, "Trek 2");
    assert_eq!(edited.category, "Other");
    assert_eq!(edited.rate, 55.0);
    assert!(!edited.available);
    // No new photos: the old ones stay.
    assert_eq!(edited.image_urls, posted.image_urls);
    assert_eq!(h.gateway.bikes(), vec![edited.clone()]);

    let photo = ImageInput::new(b"new".to_vec(), "image/gif");
    let rephotographed = h
        .gateway
        .update_bike(posted.id, "owner@x.io", edit(f64::NAN), vec![photo])
        .await?;
    assert_eq!(rephotographed.image_urls, vec!["data:image/gif;base64,bmV3".to_string()]);
    assert_eq!(
        rephotographed.image_url.as_deref(),
        Some("data:image/gif;base64,bmV3")
    );
    assert_eq!(rephotographed.rate, 0.0);
    assert_eq!(h.gateway.bikes(), vec![rephotographed]);
    Ok(())
}

#[tokio::test]
async fn test_only_the_owner_edits() -> anyhow::Result<()> {
    let mut h = harness();
    let posted = h.gateway.post_bike(listing("Trek", 40.0), Vec::new()).await?;

    let stranger = h
        .gateway
        .update_bike(posted.id, "renter@x.io", edit(1.0), Vec::new())
        .await;
    assert!(matches!(stranger, Err(GatewayError::Forbidden { .. })));

    let missing = h
        .gateway
        .update_bike(42, "owner@x.io", edit(1.0), Vec::new())
        .await;
    assert!(matches!(
        missing,
        Err(GatewayError::NotFound { entity: "bike", .. })
    ));
    assert_eq!(h.gateway.bikes(), vec![posted]);
    Ok(())
}

#[test]
fn test_delete_bike_takes_its_rentals() -> anyhow::Result<()> {
    let mut h = harness();
    assert!(h.gateway.save_bikes(&[bike(NOW, "owner@x.io"), bike(NOW - 1, "owner@x.io")]));
    assert!(h.gateway.save_rentals(&[
        rental(1, NOW, "renter@x.io", RentalStatus::Pending),
        rental(2, NOW - 1, "renter@x.io", RentalStatus::Pending),
    ]));

    let stranger = h.gateway.delete_bike(NOW, Some("renter@x.io"));
    assert!(matches!(stranger, Err(GatewayError::Forbidden { .. })));

    assert!(h.gateway.delete_bike(NOW, Some("owner@x.io"))?.is_complete());
    let bike_ids: Vec<i64> = h.gateway.bikes().iter().map(|b| b.id).collect();
    assert_eq!(bike_ids, vec![NOW - 1]);
    let rental_ids: Vec<i64> = h.gateway.rentals().iter().map(|r| r.id).collect();
    assert_eq!(rental_ids, vec![2]);
    Ok(())
}
