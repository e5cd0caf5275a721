use rocket::serde::Serialize;

/// Column-oriented table rendered as `{index, columns, data}`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SplitFrame<I, C, V> {
    pub index: Vec<I>,
    pub columns: Vec<C>,
    pub data: Vec<Vec<V>>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CacheStatsResponse {
    pub response_entries: u64,
    pub ribo_entries: u64,
    pub sequence_entries: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
}

#[derive(Serialize, Debug)]
pub struct CacheClearResponse {
    pub ok: bool,
}

#[derive(Serialize, Debug)]
pub struct DeleteResponse {
    pub ok: bool,
    pub removed_files: Vec<String>,
}
