//! Decoding of raw hits into typed models.

use crate::{
    codec::from_document,
    document::Hit,
    error::DocumentStoreResult,
    model::{FieldTable, Model},
};

/// Decodes one hit. The hit id wins over any identifier stored in `_source`.
pub fn decode_hit<M: Model>(hit: Hit, table: &FieldTable<M>) -> DocumentStoreResult<M> {
    from_document(hit.source, &hit.id, table)
}

/// Decodes hits in store order.
///
/// Decoding is all-or-nothing: the first hit that fails aborts the whole batch and no partial
/// list is returned.
pub fn decode_hits<M: Model>(hits: Vec<Hit>, table: &FieldTable<M>) -> DocumentStoreResult<Vec<M>> {
    hits.into_iter()
        .map(|hit| decode_hit(hit, table))
        .collect()
}
