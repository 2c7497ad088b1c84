//! In-memory store implementations.
//!
//! [`MemoryStores`] backs unit and HTTP-level tests without a database.
//! All collections live behind one mutex so the multi-entity operations
//! (process, allocate, register-group) are atomic exactly as their
//! PostgreSQL counterparts are, just with coarser locking.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::allocator::lowest_free_seat;
use crate::error::{Error, Result};
use crate::stores::{BookingStore, GroupStore, ProcessingStore, TravelerStore, UserStore};
use crate::types::{
    Booking, BookingId, Group, GroupId, Its, NewTraveler, NewUnit, ProcessedFields,
    ProcessedRecord, TransportUnit, Traveler, UnitAttrs, UnitId, UnitKind, User,
};

#[derive(Debug, Default)]
struct Inner {
    travelers: BTreeMap<i64, Traveler>,
    processed: Vec<ProcessedRecord>,
    next_processed_id: i64,
    units: BTreeMap<i64, TransportUnit>,
    next_unit_id: i64,
    bookings: BTreeMap<i64, Booking>,
    next_booking_id: i64,
    groups: BTreeMap<i64, Group>,
    next_group_id: i64,
    users: HashMap<String, User>,
}

/// In-memory implementation of every store trait.
#[derive(Clone, Debug, Default)]
pub struct MemoryStores {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStores {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(inner: &Arc<Mutex<Inner>>) -> Result<MutexGuard<'_, Inner>> {
        inner
            .lock()
            .map_err(|_| Error::Storage("store lock poisoned".into()))
    }
}

fn traveler_from(new: &NewTraveler) -> Traveler {
    Traveler {
        its: new.its,
        first_name: new.first_name.clone(),
        middle_name: new.middle_name.clone(),
        last_name: new.last_name.clone(),
        date_of_birth: new.date_of_birth,
        passport_no: new.passport_no.clone(),
        passport_expiry: new.passport_expiry,
        visa_no: new.visa_no.clone(),
        transport_mode: None,
        phone: None,
        arrived: false,
        arrived_at: None,
    }
}

/// Reject a passport number already held by a different traveler.
fn check_passport_free(inner: &Inner, passport: Option<&str>, its: Its) -> Result<()> {
    let Some(passport) = passport else {
        return Ok(());
    };
    let taken = inner
        .travelers
        .values()
        .any(|t| t.its != its && t.passport_no.as_deref() == Some(passport));
    if taken {
        return Err(Error::Conflict(format!(
            "passport {passport} is already registered"
        )));
    }
    Ok(())
}

impl TravelerStore for MemoryStores {
    fn create_traveler(
        &self,
        traveler: &NewTraveler,
    ) -> impl Future<Output = Result<Traveler>> + Send {
        let inner = Arc::clone(&self.inner);
        let traveler = traveler.clone();

        async move {
            let mut guard = Self::lock(&inner)?;
            if guard.travelers.contains_key(&traveler.its.get()) {
                return Err(Error::Duplicate(format!(
                    "traveler {} is already registered",
                    traveler.its
                )));
            }
            check_passport_free(&guard, traveler.passport_no.as_deref(), traveler.its)?;
            let row = traveler_from(&traveler);
            guard.travelers.insert(row.its.get(), row.clone());
            Ok(row)
        }
    }

    fn import_travelers(
        &self,
        travelers: &[NewTraveler],
    ) -> impl Future<Output = Result<u64>> + Send {
        let inner = Arc::clone(&self.inner);
        let travelers = travelers.to_vec();

        async move {
            let mut guard = Self::lock(&inner)?;
            // Validate the whole batch before touching anything.
            for (index, new) in travelers.iter().enumerate() {
                if guard.travelers.contains_key(&new.its.get())
                    || travelers[..index].iter().any(|prior| prior.its == new.its)
                {
                    return Err(Error::Duplicate(format!(
                        "traveler {} is already registered",
                        new.its
                    )));
                }
                check_passport_free(&guard, new.passport_no.as_deref(), new.its)?;
            }
            for new in &travelers {
                let row = traveler_from(new);
                guard.travelers.insert(row.its.get(), row);
            }
            Ok(travelers.len() as u64)
        }
    }

    fn traveler(&self, its: Its) -> impl Future<Output = Result<Traveler>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            Self::lock(&inner)?
                .travelers
                .get(&its.get())
                .cloned()
                .ok_or_else(|| Error::not_found("traveler", its))
        }
    }

    fn travelers_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<(Vec<Traveler>, u64)>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            let guard = Self::lock(&inner)?;
            let total = guard.travelers.len() as u64;
            let skip = (page.max(1) as usize - 1) * page_size as usize;
            let rows = guard
                .travelers
                .values()
                .skip(skip)
                .take(page_size as usize)
                .cloned()
                .collect();
            Ok((rows, total))
        }
    }

    fn mark_arrived(
        &self,
        its: Its,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Traveler>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            let mut guard = Self::lock(&inner)?;
            let traveler = guard
                .travelers
                .get_mut(&its.get())
                .ok_or_else(|| Error::not_found("traveler", its))?;
            traveler.arrived = true;
            traveler.arrived_at = Some(at);
            Ok(traveler.clone())
        }
    }

    fn arrived(&self) -> impl Future<Output = Result<Vec<Traveler>>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            let guard = Self::lock(&inner)?;
            let mut rows: Vec<Traveler> = guard
                .travelers
                .values()
                .filter(|t| t.arrived)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.arrived_at.cmp(&a.arrived_at));
            Ok(rows)
        }
    }

    fn arrived_count(&self) -> impl Future<Output = Result<u64>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            let guard = Self::lock(&inner)?;
            Ok(guard.travelers.values().filter(|t| t.arrived).count() as u64)
        }
    }

    fn assign_phone(
        &self,
        its: Its,
        phone: &str,
    ) -> impl Future<Output = Result<Traveler>> + Send {
        let inner = Arc::clone(&self.inner);
        let phone = phone.to_string();

        async move {
            let mut guard = Self::lock(&inner)?;
            if !guard.travelers.contains_key(&its.get()) {
                return Err(Error::not_found("traveler", its));
            }
            let taken = guard
                .travelers
                .values()
                .any(|t| t.its != its && t.phone.as_deref() == Some(phone.as_str()));
            if taken {
                return Err(Error::Conflict(format!(
                    "phone {phone} is already assigned"
                )));
            }
            let traveler = guard
                .travelers
                .get_mut(&its.get())
                .ok_or_else(|| Error::not_found("traveler", its))?;
            traveler.phone = Some(phone);
            Ok(traveler.clone())
        }
    }

    fn clear(&self) -> impl Future<Output = Result<u64>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            let mut guard = Self::lock(&inner)?;
            let removed = guard.travelers.len() as u64;
            // Dependent rows go with the travelers they reference.
            guard.travelers.clear();
            guard.processed.clear();
            guard.bookings.clear();
            guard.groups.clear();
            for unit in guard.units.values_mut() {
                if let UnitAttrs::Seated {
                    capacity,
                    seats_remaining,
                    ..
                } = &mut unit.attrs
                {
                    *seats_remaining = *capacity;
                }
            }
            Ok(removed)
        }
    }
}

impl ProcessingStore for MemoryStores {
    fn record_processed(
        &self,
        operator: &str,
        fields: &ProcessedFields,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<ProcessedRecord>> + Send {
        let inner = Arc::clone(&self.inner);
        let operator = operator.to_string();
        let fields = fields.clone();

        async move {
            let mut guard = Self::lock(&inner)?;
            let already = guard
                .processed
                .iter()
                .any(|r| r.its == fields.its && r.operator == operator);
            if already {
                return Err(Error::Duplicate(format!(
                    "traveler {} was already processed by {operator}",
                    fields.its
                )));
            }
            if !guard.travelers.contains_key(&fields.its.get()) {
                return Err(Error::not_found("traveler", fields.its));
            }
            check_passport_free(&guard, Some(&fields.passport_no), fields.its)?;

            let traveler = guard
                .travelers
                .get_mut(&fields.its.get())
                .ok_or_else(|| Error::not_found("traveler", fields.its))?;
            traveler.first_name = fields.first_name.clone();
            traveler.middle_name = fields.middle_name.clone();
            traveler.last_name = fields.last_name.clone();
            traveler.passport_no = Some(fields.passport_no.clone());
            traveler.passport_expiry = Some(fields.passport_expiry);
            traveler.visa_no = fields.visa_no.clone();

            guard.next_processed_id += 1;
            let record = ProcessedRecord {
                id: guard.next_processed_id,
                its: fields.its,
                operator,
                first_name: fields.first_name,
                middle_name: fields.middle_name,
                last_name: fields.last_name,
                passport_no: fields.passport_no,
                passport_expiry: fields.passport_expiry,
                visa_no: fields.visa_no,
                processed_at: at,
            };
            guard.processed.push(record.clone());
            Ok(record)
        }
    }

    fn pending(&self, operator: &str) -> impl Future<Output = Result<Vec<ProcessedRecord>>> + Send {
        let inner = Arc::clone(&self.inner);
        let operator = operator.to_string();

        async move {
            let guard = Self::lock(&inner)?;
            Ok(guard
                .processed
                .iter()
                .filter(|r| r.operator == operator)
                .cloned()
                .collect())
        }
    }

    fn pending_count(&self, operator: &str) -> impl Future<Output = Result<u64>> + Send {
        let inner = Arc::clone(&self.inner);
        let operator = operator.to_string();

        async move {
            let guard = Self::lock(&inner)?;
            Ok(guard
                .processed
                .iter()
                .filter(|r| r.operator == operator)
                .count() as u64)
        }
    }

    fn drain(&self, operator: &str) -> impl Future<Output = Result<Vec<ProcessedRecord>>> + Send {
        let inner = Arc::clone(&self.inner);
        let operator = operator.to_string();

        async move {
            let mut guard = Self::lock(&inner)?;
            let (batch, kept): (Vec<_>, Vec<_>) = guard
                .processed
                .drain(..)
                .partition(|r| r.operator == operator);
            guard.processed = kept;
            Ok(batch)
        }
    }
}

impl BookingStore for MemoryStores {
    fn add_unit(&self, unit: &NewUnit) -> impl Future<Output = Result<TransportUnit>> + Send {
        let inner = Arc::clone(&self.inner);
        let unit = unit.clone();

        async move {
            let mut guard = Self::lock(&inner)?;
            let attrs = if unit.kind.is_seated() {
                let capacity = unit.capacity.ok_or_else(|| {
                    Error::Validation(format!("{} units require a capacity", unit.kind))
                })?;
                let unit_number = guard
                    .units
                    .values()
                    .filter(|u| u.kind == unit.kind)
                    .filter_map(|u| match u.attrs {
                        UnitAttrs::Seated { unit_number, .. } => Some(unit_number),
                        UnitAttrs::Carrier { .. } => None,
                    })
                    .max()
                    .unwrap_or(0)
                    + 1;
                UnitAttrs::Seated {
                    unit_number,
                    capacity,
                    seats_remaining: capacity,
                }
            } else {
                let company = unit.company.clone().ok_or_else(|| {
                    Error::Validation(format!(
                        "{} units require an operating company",
                        unit.kind
                    ))
                })?;
                UnitAttrs::Carrier { company }
            };

            guard.next_unit_id += 1;
            let row = TransportUnit {
                id: UnitId(guard.next_unit_id),
                kind: unit.kind,
                departure_time: unit.departure_time,
                attrs,
            };
            guard.units.insert(row.id.0, row.clone());
            Ok(row)
        }
    }

    fn unit(&self, id: UnitId) -> impl Future<Output = Result<TransportUnit>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            Self::lock(&inner)?
                .units
                .get(&id.0)
                .cloned()
                .ok_or_else(|| Error::not_found("transport unit", id))
        }
    }

    fn units(
        &self,
        kind: Option<UnitKind>,
    ) -> impl Future<Output = Result<Vec<TransportUnit>>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            let guard = Self::lock(&inner)?;
            Ok(guard
                .units
                .values()
                .filter(|u| kind.is_none_or(|k| u.kind == k))
                .cloned()
                .collect())
        }
    }

    fn try_allocate(
        &self,
        its: Its,
        unit_id: UnitId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Booking>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            let mut guard = Self::lock(&inner)?;
            if !guard.travelers.contains_key(&its.get()) {
                return Err(Error::not_found("traveler", its));
            }
            let kind = guard
                .units
                .get(&unit_id.0)
                .ok_or_else(|| Error::not_found("transport unit", unit_id))?
                .kind;

            let already = guard
                .bookings
                .values()
                .any(|b| b.its == its && b.kind == kind);
            if already {
                return Err(Error::Duplicate(format!(
                    "traveler {its} already holds a {kind} booking"
                )));
            }

            let seat = if kind.is_seated() {
                let taken: Vec<i32> = guard
                    .bookings
                    .values()
                    .filter(|b| b.unit_id == unit_id)
                    .filter_map(|b| b.seat)
                    .collect();
                let unit = guard
                    .units
                    .get_mut(&unit_id.0)
                    .ok_or_else(|| Error::not_found("transport unit", unit_id))?;
                let UnitAttrs::Seated {
                    seats_remaining, ..
                } = &mut unit.attrs
                else {
                    return Err(Error::Storage("seated unit without seat attrs".into()));
                };
                if *seats_remaining == 0 {
                    return Err(Error::Full { unit: unit_id.0 });
                }
                *seats_remaining -= 1;
                Some(lowest_free_seat(&taken))
            } else {
                None
            };

            guard.next_booking_id += 1;
            let booking = Booking {
                id: BookingId(guard.next_booking_id),
                its,
                unit_id,
                kind,
                seat,
                booked_at: at,
            };
            guard.bookings.insert(booking.id.0, booking.clone());
            Ok(booking)
        }
    }

    fn cancel(&self, id: BookingId) -> impl Future<Output = Result<()>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            let mut guard = Self::lock(&inner)?;
            let booking = guard
                .bookings
                .remove(&id.0)
                .ok_or_else(|| Error::not_found("booking", id))?;
            if booking.seat.is_some() {
                if let Some(unit) = guard.units.get_mut(&booking.unit_id.0) {
                    if let UnitAttrs::Seated {
                        seats_remaining, ..
                    } = &mut unit.attrs
                    {
                        *seats_remaining += 1;
                    }
                }
            }
            Ok(())
        }
    }

    fn booking(&self, id: BookingId) -> impl Future<Output = Result<Booking>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            Self::lock(&inner)?
                .bookings
                .get(&id.0)
                .cloned()
                .ok_or_else(|| Error::not_found("booking", id))
        }
    }

    fn bookings_for(&self, its: Its) -> impl Future<Output = Result<Vec<Booking>>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            let guard = Self::lock(&inner)?;
            if !guard.travelers.contains_key(&its.get()) {
                return Err(Error::not_found("traveler", its));
            }
            Ok(guard
                .bookings
                .values()
                .filter(|b| b.its == its)
                .cloned()
                .collect())
        }
    }
}

impl GroupStore for MemoryStores {
    fn register_group(
        &self,
        leader: Its,
        members: &[Its],
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Group>> + Send {
        let inner = Arc::clone(&self.inner);
        let members = members.to_vec();

        async move {
            let mut guard = Self::lock(&inner)?;
            for its in std::iter::once(leader).chain(members.iter().copied()) {
                if !guard.travelers.contains_key(&its.get()) {
                    return Err(Error::not_found("traveler", its));
                }
            }

            guard.next_group_id += 1;
            let group = Group {
                id: GroupId(guard.next_group_id),
                leader,
                members,
                created_at: at,
            };
            guard.groups.insert(group.id.0, group.clone());
            Ok(group)
        }
    }

    fn group(&self, id: GroupId) -> impl Future<Output = Result<Group>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            Self::lock(&inner)?
                .groups
                .get(&id.0)
                .cloned()
                .ok_or_else(|| Error::not_found("group", id))
        }
    }
}

impl UserStore for MemoryStores {
    fn create_user(&self, user: &User) -> impl Future<Output = Result<User>> + Send {
        let inner = Arc::clone(&self.inner);
        let user = user.clone();

        async move {
            let mut guard = Self::lock(&inner)?;
            if guard.users.contains_key(&user.username) {
                return Err(Error::Duplicate(format!(
                    "username {} is taken",
                    user.username
                )));
            }
            guard.users.insert(user.username.clone(), user.clone());
            Ok(user)
        }
    }

    fn user(&self, username: &str) -> impl Future<Output = Result<User>> + Send {
        let inner = Arc::clone(&self.inner);
        let username = username.to_string();

        async move {
            let guard = Self::lock(&inner)?;
            guard
                .users
                .get(&username)
                .cloned()
                .ok_or_else(|| Error::not_found("user", &username))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;

    fn new_traveler(its: i64, passport: Option<&str>) -> NewTraveler {
        NewTraveler {
            its: Its::new(its).unwrap(),
            first_name: "Amina".into(),
            middle_name: None,
            last_name: "Khan".into(),
            date_of_birth: None,
            passport_no: passport.map(str::to_string),
            passport_expiry: None,
            visa_no: None,
        }
    }

    #[tokio::test]
    async fn duplicate_its_is_rejected() {
        let stores = MemoryStores::new();
        stores.create_traveler(&new_traveler(1, None)).await.unwrap();
        let err = stores
            .create_traveler(&new_traveler(1, None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Duplicate(_)));
    }

    #[tokio::test]
    async fn duplicate_passport_is_a_conflict() {
        let stores = MemoryStores::new();
        stores
            .create_traveler(&new_traveler(1, Some("P1")))
            .await
            .unwrap();
        let err = stores
            .create_traveler(&new_traveler(2, Some("P1")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn import_is_all_or_nothing() {
        let stores = MemoryStores::new();
        stores.create_traveler(&new_traveler(2, None)).await.unwrap();

        let batch = vec![new_traveler(1, None), new_traveler(2, None)];
        assert!(stores.import_travelers(&batch).await.is_err());
        // The first row must not have been committed.
        assert!(stores.traveler(Its::new(1).unwrap()).await.is_err());

        let batch = vec![new_traveler(3, None), new_traveler(4, None)];
        assert_eq!(stores.import_travelers(&batch).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn pagination_walks_its_order() {
        let stores = MemoryStores::new();
        for its in [5, 3, 1, 4, 2] {
            stores.create_traveler(&new_traveler(its, None)).await.unwrap();
        }

        let (page, total) = stores.travelers_page(1, 2).await.unwrap();
        assert_eq!(total, 5);
        let ids: Vec<i64> = page.iter().map(|t| t.its.get()).collect();
        assert_eq!(ids, vec![1, 2]);

        let (page, _) = stores.travelers_page(3, 2).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].its.get(), 5);
    }

    #[tokio::test]
    async fn arrivals_order_most_recent_first() {
        let stores = MemoryStores::new();
        for its in 1..=3 {
            stores.create_traveler(&new_traveler(its, None)).await.unwrap();
        }
        let base = Utc::now();
        for (its, offset) in [(1, 0), (2, 60), (3, 30)] {
            stores
                .mark_arrived(
                    Its::new(its).unwrap(),
                    base + chrono::Duration::seconds(offset),
                )
                .await
                .unwrap();
        }

        let arrived = stores.arrived().await.unwrap();
        let ids: Vec<i64> = arrived.iter().map(|t| t.its.get()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(stores.arrived_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn phone_assignment_is_unique() {
        let stores = MemoryStores::new();
        stores.create_traveler(&new_traveler(1, None)).await.unwrap();
        stores.create_traveler(&new_traveler(2, None)).await.unwrap();

        stores
            .assign_phone(Its::new(1).unwrap(), "+966500000001")
            .await
            .unwrap();
        let err = stores
            .assign_phone(Its::new(2).unwrap(), "+966500000001")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn clear_cascades_to_dependents() {
        let stores = MemoryStores::new();
        stores.create_traveler(&new_traveler(1, None)).await.unwrap();
        let unit = stores
            .add_unit(&NewUnit {
                kind: UnitKind::Bus,
                departure_time: None,
                capacity: Some(2),
                company: None,
            })
            .await
            .unwrap();
        stores
            .try_allocate(Its::new(1).unwrap(), unit.id, Utc::now())
            .await
            .unwrap();

        assert_eq!(stores.clear().await.unwrap(), 1);
        let unit = stores.unit(unit.id).await.unwrap();
        assert_eq!(unit.seats_remaining(), Some(2));
    }
}
