use tracing::{info, warn};

use crate::{GatewayError, KeyValueStore, Ladder, StorageGateway, gateway::keys, model::Route};

/// Editable fields of a route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRoute {
    pub name: String,
    pub route_type: String,
    pub start_location: String,
    pub end_location: String,
    pub distance: String,
    pub time_estimate: String,
    pub description: String,
    pub photo_url: String,
    pub map_embed: String,
    pub created_by: String,
}

impl NewRoute {
    fn apply_to(self, route: &mut Route) {
        route.name = self.name;
        route.route_type = self.route_type;
        route.start_location = self.start_location;
        route.end_location = self.end_location;
        route.distance = self.distance;
        route.time_estimate = self.time_estimate;
        route.description = self.description;
        route.photo_url = self.photo_url;
        route.map_embed = self.map_embed;
    }
}

impl<P: KeyValueStore, S: KeyValueStore> StorageGateway<P, S> {
    /// Publishes a route stamped with the current time and a zero view count.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StorageExhausted`] if the route could not be saved.
    pub fn add_route(&mut self, new_route: NewRoute) -> Result<Route, GatewayError> {
        let now = self.now();
        let mut route = Route {
            id: now,
            name: String::new(),
            route_type: String::new(),
            start_location: String::new(),
            end_location: String::new(),
            distance: String::new(),
            time_estimate: String::new(),
            description: String::new(),
            photo_url: String::new(),
            map_embed: String::new(),
            created_at: Some(now),
            created_by: new_route.created_by.clone(),
            view_count: 0,
        };
        new_route.apply_to(&mut route);

        self.update_with_ladder(keys::ROUTES, &Ladder::standard(), |routes: &mut Vec<Route>| {
            routes.push(route.clone());
        })?;
        info!(id = route.id, name = %route.name, "route added");
        Ok(route)
    }

    /// Replaces the editable fields of a route, keeping its id, author, creation time and
    /// view count.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] or [`GatewayError::StorageExhausted`].
    pub fn update_route(&mut self, id: i64, update: NewRoute) -> Result<Route, GatewayError> {
        let mut routes = self.routes();
        let route = routes
            .iter_mut()
            .find(|route| route.id == id)
            .ok_or_else(|| GatewayError::not_found("route", id))?;
        update.apply_to(route);
        let updated = route.clone();
        self.update_with_ladder(keys::ROUTES, &Ladder::standard(), |routes: &mut Vec<Route>| {
            if let Some(stored) = routes.iter_mut().find(|stored| stored.id == id) {
                *stored = updated.clone();
            }
        })?;
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] or [`GatewayError::StorageExhausted`].
    pub fn delete_route(&mut self, id: i64) -> Result<Route, GatewayError> {
        let mut routes = self.routes();
        let index = routes
            .iter()
            .position(|route| route.id == id)
            .ok_or_else(|| GatewayError::not_found("route", id))?;
        let removed = routes.remove(index);
        self.update_with_ladder(keys::ROUTES, &Ladder::standard(), |routes: &mut Vec<Route>| {
            routes.retain(|route| route.id != id);
        })?;
        Ok(removed)
    }

    /// Counts a view of a route and returns it with the new count. View counts are
    /// cosmetic, so a rejected write is logged and the counted route returned anyway.
    pub fn record_route_view(&mut self, id: i64) -> Option<Route> {
        let mut routes = self.routes();
        let route = routes.iter_mut().find(|route| route.id == id)?;
        route.view_count += 1;
        let viewed = route.clone();
        if !self.save_routes(&routes) {
            warn!(id, "view count not persisted");
        }
        Some(viewed)
    }
}
