/// Authorization reconciler
///
/// Replaces the set of targets of one grant kind an account may access.
///
/// # Flow
///
/// ```text
/// requested ids ──dedupe──> requested set
/// old granted − requested ──> revocations
/// revocations ∩ usage index ≠ ∅ ──> TargetInUse (nothing written)
/// resolve every requested id ──> TargetNotFound (nothing written)
/// replace grants of that kind in one transaction
/// ```
///
/// Directory resources are granted `Readable`; every other target
/// `Writable`. An empty request revokes everything, subject to the same
/// usage gate.
///
/// # Example
///
/// ```no_run
/// use custodian_admin::reconciler::{parse_target_ids, Reconciler, UsageIndex};
/// use custodian_admin::store::{AccountStore, MemoryAccountStore};
/// use custodian_shared::models::grant::GrantKind;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(MemoryAccountStore::new());
/// let reconciler = Reconciler::new(store.clone());
///
/// let requested = parse_target_ids("1-4-9,12")?;
/// let usage = UsageIndex::from_usages(store.list_definition_usages(7).await?);
///
/// let outcome = reconciler
///     .reconcile_current(7, GrantKind::Resource, &requested, &usage)
///     .await?;
/// println!("revoked {:?}", outcome.revoked);
/// # Ok(())
/// # }
/// ```

use crate::error::{AdminError, AdminResult, TargetRef};
use crate::store::AccountStore;
use custodian_shared::models::grant::{GrantKind, NewGrant, Permission};
use custodian_shared::models::workflow::DefinitionUsage;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

/// Resource ID to the released workflow definitions referencing it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageIndex {
    usages: BTreeMap<i32, BTreeSet<i64>>,
}

impl UsageIndex {
    /// Index with no usages
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds an index from usage rows
    pub fn from_usages(usages: impl IntoIterator<Item = DefinitionUsage>) -> Self {
        let mut index = Self::empty();
        for usage in usages {
            index.insert(usage.resource_id, usage.definition_code);
        }
        index
    }

    /// Records that `definition_code` references `target_id`
    pub fn insert(&mut self, target_id: i32, definition_code: i64) {
        self.usages
            .entry(target_id)
            .or_default()
            .insert(definition_code);
    }

    /// Definitions referencing `target_id`
    pub fn definitions(&self, target_id: i32) -> Option<&BTreeSet<i64>> {
        self.usages.get(&target_id)
    }

    /// Whether no target is referenced
    pub fn is_empty(&self) -> bool {
        self.usages.is_empty()
    }

    /// Restriction of the index to `ids`
    fn blocking<'a>(&self, ids: impl IntoIterator<Item = &'a i32>) -> BTreeMap<i32, BTreeSet<i64>> {
        ids.into_iter()
            .filter_map(|id| self.usages.get(id).map(|defs| (*id, defs.clone())))
            .collect()
    }
}

/// Parses a raw target ID list
///
/// IDs are comma-separated; an entry may be a dash-separated ancestor chain
/// (`"1-4-9"`), every member of which is requested. Whitespace around IDs is
/// ignored and a blank string is an empty request.
///
/// ```
/// use custodian_admin::reconciler::parse_target_ids;
///
/// assert_eq!(parse_target_ids("1-4-9, 12").unwrap(), vec![1, 4, 9, 12]);
/// assert!(parse_target_ids("  ").unwrap().is_empty());
/// assert!(parse_target_ids("3,x").is_err());
/// ```
pub fn parse_target_ids(raw: &str) -> AdminResult<Vec<i32>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    raw.split(',')
        .flat_map(|entry| entry.split('-'))
        .map(|id| {
            let id = id.trim();
            id.parse::<i32>()
                .map_err(|_| AdminError::InvalidArgument(format!("invalid target id '{}' in '{}'", id, raw)))
        })
        .collect()
}

/// Parses a comma-separated ID list without ancestor chains
///
/// Used for targets that have no hierarchy (UDFs, data sources, projects);
/// an entry containing `-` is rejected.
///
/// ```
/// use custodian_admin::reconciler::parse_plain_ids;
///
/// assert_eq!(parse_plain_ids("3, 4").unwrap(), vec![3, 4]);
/// assert!(parse_plain_ids("3-4").is_err());
/// ```
pub fn parse_plain_ids(raw: &str) -> AdminResult<Vec<i32>> {
    if raw.contains('-') {
        return Err(AdminError::InvalidArgument(format!(
            "ancestor chains are only accepted for resources, got '{}'",
            raw
        )));
    }

    parse_target_ids(raw)
}

/// Parses `raw` in the format accepted for `kind`
pub fn parse_ids_for(kind: GrantKind, raw: &str) -> AdminResult<Vec<i32>> {
    match kind {
        GrantKind::Resource => parse_target_ids(raw),
        _ => parse_plain_ids(raw),
    }
}

/// Removes repeated IDs, keeping first occurrences in order
pub fn dedupe(ids: &[i32]) -> Vec<i32> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Grant changes decided before anything is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantDelta {
    /// Deduplicated requested IDs, first occurrence order
    pub requested: Vec<i32>,

    /// Previously granted IDs that are not requested, ascending
    pub revoked: Vec<i32>,

    /// Requested IDs that were not previously granted
    pub added: Vec<i32>,
}

/// Computes the delta between old and requested grants
///
/// # Errors
///
/// `TargetInUse` when a revocation hits a referenced target
pub fn plan(requested: &[i32], old_granted: &[i32], usage: &UsageIndex) -> AdminResult<GrantDelta> {
    let requested = dedupe(requested);
    let requested_set: HashSet<i32> = requested.iter().copied().collect();
    let old_set: BTreeSet<i32> = old_granted.iter().copied().collect();

    let revoked: Vec<i32> = old_set
        .iter()
        .copied()
        .filter(|id| !requested_set.contains(id))
        .collect();

    let blocked = usage.blocking(&revoked);
    if !blocked.is_empty() {
        return Err(AdminError::TargetInUse {
            ids: blocked.keys().copied().collect(),
            definitions: blocked,
        });
    }

    let added = requested
        .iter()
        .copied()
        .filter(|id| !old_set.contains(id))
        .collect();

    Ok(GrantDelta {
        requested,
        revoked,
        added,
    })
}

/// Result of a successful reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Grants now held for the kind, in request order
    pub granted: Vec<NewGrant>,

    /// IDs no longer granted
    pub revoked: Vec<i32>,

    /// IDs newly granted
    pub added: Vec<i32>,
}

/// Applies requested grant sets through an [`AccountStore`]
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn AccountStore>,
}

impl Reconciler {
    /// Creates a reconciler over `store`
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Reconciler { store }
    }

    /// Replaces the grants of `kind` held by `account_id`
    ///
    /// `old_granted` is the set the usage gate is checked against.
    ///
    /// # Errors
    ///
    /// - `TargetInUse` if a revocation hits a referenced target
    /// - `TargetNotFound` if a requested ID does not resolve
    /// - `Store` if persistence fails
    ///
    /// On any error the account's grants are unchanged.
    pub async fn reconcile(
        &self,
        account_id: i32,
        kind: GrantKind,
        requested: &[i32],
        old_granted: &[i32],
        usage: &UsageIndex,
    ) -> AdminResult<ReconcileOutcome> {
        let delta = match plan(requested, old_granted, usage) {
            Ok(delta) => delta,
            Err(AdminError::TargetInUse { ids, definitions }) => {
                for (id, codes) in &definitions {
                    tracing::error!(
                        account_id,
                        kind = %kind,
                        target_id = id,
                        definitions = ?codes,
                        "Revocation blocked by released workflow definitions"
                    );
                }
                return Err(AdminError::TargetInUse { ids, definitions });
            }
            Err(e) => return Err(e),
        };

        let mut granted = Vec::with_capacity(delta.requested.len());
        for id in &delta.requested {
            let target = self
                .store
                .find_grant_target(kind, *id)
                .await?
                .ok_or(AdminError::TargetNotFound(TargetRef::Target { kind, id: *id }))?;

            let permission = match kind {
                GrantKind::Resource => Permission::for_target(target.is_directory),
                _ => Permission::writable(),
            };
            granted.push(NewGrant {
                target_id: target.id,
                permission,
            });
        }

        self.store
            .replace_grants(account_id, kind, &granted)
            .await?;

        tracing::info!(
            account_id,
            kind = %kind,
            granted = granted.len(),
            added = delta.added.len(),
            revoked = delta.revoked.len(),
            "Grants reconciled"
        );

        Ok(ReconcileOutcome {
            granted,
            revoked: delta.revoked,
            added: delta.added,
        })
    }

    /// Like [`Reconciler::reconcile`], reading the old set from the store
    pub async fn reconcile_current(
        &self,
        account_id: i32,
        kind: GrantKind,
        requested: &[i32],
        usage: &UsageIndex,
    ) -> AdminResult<ReconcileOutcome> {
        let old_granted = self.store.list_granted_ids(account_id, kind).await?;
        self.reconcile(account_id, kind, requested, &old_granted, usage)
            .await
    }
}
