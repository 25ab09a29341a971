use tracing::info;

use crate::{
    CascadeOutcome, CompressionSettings, GatewayError, ImageInput, KeyValueStore, Ladder,
    StorageGateway,
    cascade::Cascade,
    compress_images,
    gateway::keys,
    model::{Bike, Rental, finite_or_zero},
};

/// A listing as submitted by its owner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewBike {
    pub owner: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub rate: f64,
    pub location: String,
    pub available: bool,
}

/// An owner's edit of a listing. Every field replaces the stored one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BikeUpdate {
    pub name: String,
    pub category: String,
    pub description: String,
    pub rate: f64,
    pub location: String,
    pub available: bool,
}

fn category_or_other(category: String) -> String {
    if category.trim().is_empty() {
        "Other".to_string()
    } else {
        category
    }
}

async fn image_urls(images: Vec<ImageInput>, settings: &CompressionSettings) -> Vec<String> {
    compress_images(images, settings)
        .await
        .into_iter()
        .map(|compression| compression.into_data_url())
        .collect()
}

impl<P: KeyValueStore, S: KeyValueStore> StorageGateway<P, S> {
    /// Publishes a listing. Each photo is compressed before the write, which runs through
    /// a single gentle cleanup pass if the store is full.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StorageExhausted`] if the listing could not be saved.
    pub async fn post_bike(
        &mut self,
        listing: NewBike,
        images: Vec<ImageInput>,
    ) -> Result<Bike, GatewayError> {
        let settings = self.config.compression.clone();
        let image_urls = image_urls(images, &settings).await;

        let mut bike = Bike {
            id: self.now(),
            owner: listing.owner.trim().to_lowercase(),
            name: listing.name,
            category: category_or_other(listing.category),
            description: listing.description,
            rate: finite_or_zero(listing.rate),
            location: listing.location,
            available: listing.available,
            image_urls: Vec::new(),
            image_url: None,
        };
        bike.set_images(image_urls);

        self.update_with_ladder(keys::BIKES, &Ladder::gentle(), |bikes: &mut Vec<Bike>| {
            bikes.push(bike.clone());
        })?;
        info!(id = bike.id, owner = %bike.owner, "bike listed");
        Ok(bike)
    }

    /// Lets `owner` edit one of their listings. New photos are compressed and replace the
    /// old ones; with no photos the stored images are kept.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unknown id, [`GatewayError::Forbidden`] if
    /// the listing belongs to someone else, or [`GatewayError::StorageExhausted`].
    pub async fn update_bike(
        &mut self,
        id: i64,
        owner: &str,
        update: BikeUpdate,
        images: Vec<ImageInput>,
    ) -> Result<Bike, GatewayError> {
        let mut bike = self
            .bikes()
            .into_iter()
            .find(|bike| bike.id == id)
            .ok_or_else(|| GatewayError::not_found("bike", id))?;
        if !bike.is_owned_by(owner) {
            return Err(GatewayError::Forbidden {
                message: format!("bike {id} is not listed by {owner}"),
            });
        }

        if !images.is_empty() {
            let settings = self.config.compression.clone();
            bike.set_images(image_urls(images, &settings).await);
        }
        bike.name = update.name.trim().to_string();
        bike.category = category_or_other(update.category);
        bike.description = update.description.trim().to_string();
        bike.rate = finite_or_zero(update.rate);
        bike.location = update.location.trim().to_string();
        bike.available = update.available;

        self.update_with_ladder(keys::BIKES, &Ladder::gentle(), |bikes: &mut Vec<Bike>| {
            if let Some(stored) = bikes.iter_mut().find(|stored| stored.id == id) {
                *stored = bike.clone();
            }
        })?;
        info!(id, owner = %bike.owner, "bike updated");
        Ok(bike)
    }

    /// Removes a listing and every rental that references it. With `owner` set, only
    /// that user's listing may be removed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unknown id, or [`GatewayError::Forbidden`]
    /// if the listing belongs to someone other than `owner`.
    pub fn delete_bike(
        &mut self,
        id: i64,
        owner: Option<&str>,
    ) -> Result<CascadeOutcome, GatewayError> {
        let bike = self
            .bikes()
            .into_iter()
            .find(|bike| bike.id == id)
            .ok_or_else(|| GatewayError::not_found("bike", id))?;
        if let Some(owner) = owner
            && !bike.is_owned_by(owner)
        {
            return Err(GatewayError::Forbidden {
                message: format!("bike {id} is not listed by {owner}"),
            });
        }

        let ladder = Ladder::standard();
        let mut cascade = Cascade::new("delete_bike");
        cascade
            .step(keys::BIKES, || {
                self.update_with_ladder(keys::BIKES, &ladder, |bikes: &mut Vec<Bike>| {
                    bikes.retain(|bike| bike.id != id);
                })
                .is_ok()
            })
            .step(keys::RENTALS, || {
                self.update_with_ladder(keys::RENTALS, &ladder, |rentals: &mut Vec<Rental>| {
                    rentals.retain(|rental| rental.bike_id != id);
                })
                .is_ok()
            });
        Ok(cascade.finish())
    }

    pub fn bikes_by_owner(&self, email: &str) -> Vec<Bike> {
        self.bikes()
            .into_iter()
            .filter(|bike| bike.is_owned_by(email))
            .collect()
    }

    pub fn available_bikes(&self) -> Vec<Bike> {
        self.bikes().into_iter().filter(|bike| bike.available).collect()
    }
}
