//! # Queries
//!
//! Iteration over every entity holding a fixed set of component types.
//!
//! ## Driving Array
//!
//! A query over `{T1..Tn}` walks the dense entity list of the *smallest*
//! required array and probes the others through their sparse tables:
//!
//! ```text
//! Position  [■■■■■■■■■■■■■■■■■■■■]  20 entries
//! Velocity  [■■■■■■■■]                8 entries
//! Player    [■■]                      2 entries  <- driving array
//!
//! cost = 2 walks * 2 probes, not 20 * 2
//! ```
//!
//! Queries borrow the world, so structural mutation while a query is being
//! consumed is rejected at compile time.

use std::fmt;

use crate::error::EcsResult;

use super::component::Component;
use super::entity::EntityId;
use super::registry::{downcast_array, StorageSource};
use super::storage::ComponentArray;

/// A set of component types that can be queried together.
///
/// Implemented for tuples of one to six component types:
/// `(A,)`, `(A, B)`, ... `(A, B, C, D, E, F)`.
pub trait QueryData {
    /// Borrowed arrays, one per component type.
    type Fetch<'w>: Copy;

    /// Per-entity item: one shared reference per component type.
    type Item<'w>;

    /// Borrows the arrays for every type in the set.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredType`](crate::EcsError::UnregisteredType)
    /// for the first type that is not visible in `source`.
    fn fetch<'w, S: StorageSource<'w>>(source: S) -> EcsResult<Self::Fetch<'w>>;

    /// Returns `true` if the set names the component with `id`.
    fn contains_id(id: u8) -> bool;

    /// Name of the component with `id`, if the set names it.
    fn name_of(id: u8) -> Option<&'static str>;

    /// Entities of the smallest array in the set.
    fn driving<'w>(fetch: Self::Fetch<'w>) -> &'w [EntityId];

    /// Fetches the item for `entity` if it is present in every array.
    fn probe<'w>(fetch: Self::Fetch<'w>, entity: EntityId) -> Option<Self::Item<'w>>;
}

macro_rules! impl_query_data {
    ($(($name:ident, $array:ident)),+) => {
        impl<$($name: Component),+> QueryData for ($($name,)+) {
            type Fetch<'w> = ($(&'w ComponentArray<$name>,)+);
            type Item<'w> = ($(&'w $name,)+);

            fn fetch<'w, S: StorageSource<'w>>(source: S) -> EcsResult<Self::Fetch<'w>> {
                Ok(($(downcast_array::<$name, S>(source)?,)+))
            }

            fn contains_id(id: u8) -> bool {
                $($name::ID == id)||+
            }

            fn name_of(id: u8) -> Option<&'static str> {
                $(
                    if $name::ID == id {
                        return Some($name::type_name());
                    }
                )+
                None
            }

            fn driving<'w>(fetch: Self::Fetch<'w>) -> &'w [EntityId] {
                let ($($array,)+) = fetch;
                let mut driving: Option<&'w [EntityId]> = None;
                $(
                    let candidate = $array.entities();
                    match driving {
                        // Ties keep the earlier array.
                        Some(current) if current.len() <= candidate.len() => {}
                        _ => driving = Some(candidate),
                    }
                )+
                driving.unwrap_or(&[])
            }

            fn probe<'w>(fetch: Self::Fetch<'w>, entity: EntityId) -> Option<Self::Item<'w>> {
                let ($($array,)+) = fetch;
                Some(($($array.get(entity)?,)+))
            }
        }
    };
}

impl_query_data!((A, a));
impl_query_data!((A, a), (B, b));
impl_query_data!((A, a), (B, b), (C, c));
impl_query_data!((A, a), (B, b), (C, c), (D, d));
impl_query_data!((A, a), (B, b), (C, c), (D, d), (E, e));
impl_query_data!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f));

/// A prepared query over the component set `Q`.
///
/// Each call to [`Query::iter`] starts a fresh pass.
///
/// # Example
///
/// ```rust
/// use tessera_core::{Position, Velocity, World};
///
/// let mut world = World::new();
/// world.register_component::<Position>().unwrap();
/// world.register_component::<Velocity>().unwrap();
///
/// let e = world.create_entity().unwrap();
/// world.add_component(e, Position::new(0.0, 0.0, 0.0)).unwrap();
/// world.add_component(e, Velocity::new(1.0, 0.0, 0.0)).unwrap();
///
/// let query = world.query::<(Position, Velocity)>().unwrap();
/// for (entity, (pos, vel)) in query.iter() {
///     assert_eq!(entity, e);
///     assert_eq!(pos.x + vel.x, 1.0);
/// }
/// ```
pub struct Query<'w, Q: QueryData> {
    fetch: Q::Fetch<'w>,
}

impl<'w, Q: QueryData> Query<'w, Q> {
    /// Prepares a query against `source`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredType`](crate::EcsError::UnregisteredType)
    /// if any type in `Q` is not registered.
    pub fn new<S: StorageSource<'w>>(source: S) -> EcsResult<Self> {
        Ok(Self { fetch: Q::fetch(source)? })
    }

    /// Number of entries in the driving array, an upper bound on the number
    /// of matches.
    #[inline]
    #[must_use]
    pub fn driving_len(&self) -> usize {
        Q::driving(self.fetch).len()
    }

    /// Iterates over matching entities in the driving array's dense order.
    #[inline]
    #[must_use]
    pub fn iter(&self) -> QueryIter<'w, Q> {
        QueryIter {
            fetch: self.fetch,
            entities: Q::driving(self.fetch).iter(),
        }
    }

    /// Fetches the item for a single entity, if it matches.
    #[inline]
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<Q::Item<'w>> {
        Q::probe(self.fetch, entity)
    }
}

impl<Q: QueryData> Clone for Query<'_, Q> {
    fn clone(&self) -> Self {
        Self { fetch: self.fetch }
    }
}

impl<Q: QueryData> fmt::Debug for Query<'_, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("driving_len", &self.driving_len())
            .finish()
    }
}

impl<'w, Q: QueryData> IntoIterator for Query<'w, Q> {
    type Item = (EntityId, Q::Item<'w>);
    type IntoIter = QueryIter<'w, Q>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'w, Q: QueryData> IntoIterator for &Query<'w, Q> {
    type Item = (EntityId, Q::Item<'w>);
    type IntoIter = QueryIter<'w, Q>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over a [`Query`]'s matches.
pub struct QueryIter<'w, Q: QueryData> {
    fetch: Q::Fetch<'w>,
    entities: std::slice::Iter<'w, EntityId>,
}

impl<'w, Q: QueryData> Iterator for QueryIter<'w, Q> {
    type Item = (EntityId, Q::Item<'w>);

    fn next(&mut self) -> Option<Self::Item> {
        self.entities
            .by_ref()
            .find_map(|&entity| Q::probe(self.fetch, entity).map(|item| (entity, item)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.entities.len()))
    }
}

impl<Q: QueryData> std::iter::FusedIterator for QueryIter<'_, Q> {}
