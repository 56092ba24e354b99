//! Full-text search queries and their result sets.
//!
//! A [`Search`] describes one query with its filters, grouping and sorting.
//! Several of them can be sent together as a batch ([`SearchQueries`]); the
//! daemon answers with one [`QueryResult`] per query, each carrying its own
//! status, so a failed query does not fail the batch.
use std::{
    fmt,
    time::{Duration, UNIX_EPOCH},
};

use bitflags::bitflags;
use log::trace;

use crate::{
    protocol::{ApiReader, ApiWriter, Command, DecodeError, Query, Request, Status},
    value::{DocId, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum MatchMode {
    #[default]
    All = 0,
    Any,
    Phrase,
    Boolean,
    Extended,
    Fullscan,
    Extended2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum RankMode {
    #[default]
    ProximityBm25 = 0,
    Bm25,
    None,
    WordCount,
    Proximity,
    MatchAny,
    FieldMask,
    Sph04,
    /// Ranks with the expression set by [`Search::set_ranking_expression`].
    Expr,
    Export,
    Plugin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum SortMode {
    #[default]
    Relevance = 0,
    AttrDesc,
    AttrAsc,
    TimeSegments,
    Extended,
    Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum GroupFunc {
    #[default]
    Day = 0,
    Week,
    Month,
    Year,
    Attr,
    Multiple = 6,
}

bitflags! {
    /// Per-query switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct QueryFlags: u32 {
        const REVERSE_SCAN = 1 << 0;
        const SORT_KBUFFER = 1 << 1;
        /// Also sends the predicted time limit; see [`Search::set_max_predicted_time`].
        const MAX_PREDICTED_TIME = 1 << 2;
        const SIMPLIFY = 1 << 3;
        const PLAIN_IDF = 1 << 4;
        const GLOBAL_IDF = 1 << 5;
        const NORMALIZED_TF_IDF = 1 << 6;
        const LOCAL_DF = 1 << 7;
        const LOW_PRIORITY = 1 << 8;
        const FACET = 1 << 9;
        const FACET_HEAD = 1 << 10;
        const JSON_QUERY = 1 << 11;
    }
}

impl Default for QueryFlags {
    fn default() -> Self {
        QueryFlags::NORMALIZED_TF_IDF
    }
}

/// What a [`Filter`] compares its attribute against.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Any of the listed integers.
    Values(Vec<i64>),
    /// Inclusive integer range.
    Range { min: i64, max: i64 },
    /// Inclusive float range.
    FloatRange { min: f32, max: f32 },
    String(String),
    /// `true` matches documents where the attribute is null.
    Null(bool),
    /// Values stored on the daemon under a user variable, as `@name`.
    Uservar(String),
    StringList(Vec<String>),
    /// The attribute field holds a boolean expression instead of a name.
    Expression,
}

const ID_RANGE_FILTER: u32 = 1;

impl FilterValue {
    fn code(&self) -> u32 {
        match self {
            FilterValue::Values(_) => 0,
            FilterValue::Range { .. } => 1,
            FilterValue::FloatRange { .. } => 2,
            FilterValue::String(_) => 3,
            FilterValue::Null(_) => 4,
            FilterValue::Uservar(_) => 5,
            FilterValue::StringList(_) => 6,
            FilterValue::Expression => 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub attribute: String,
    pub value: FilterValue,
    pub exclude: bool,
}

impl Filter {
    fn encode(&self, writer: &mut ApiWriter<'_>) {
        writer.put_string(&self.attribute);
        writer.put_u32(self.value.code());
        match &self.value {
            FilterValue::Values(values) => {
                writer.put_len(values.len());
                for v in values {
                    writer.put_i64(*v);
                }
            }
            FilterValue::Range { min, max } => {
                writer.put_i64(*min);
                writer.put_i64(*max);
            }
            FilterValue::FloatRange { min, max } => {
                writer.put_f32(*min);
                writer.put_f32(*max);
            }
            FilterValue::String(s) | FilterValue::Uservar(s) => writer.put_string(s),
            FilterValue::Null(is_null) => writer.put_bool_byte(*is_null),
            FilterValue::StringList(values) => {
                writer.put_len(values.len());
                for v in values {
                    writer.put_string(v);
                }
            }
            FilterValue::Expression => {}
        }
        writer.put_bool_dword(self.exclude);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct GeoAnchor {
    lat_attr: String,
    lon_attr: String,
    lat: f32,
    lon: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OuterSelect {
    order_by: String,
    offset: i32,
    limit: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct TokenFilter {
    library: String,
    name: String,
    options: String,
}

/// One search query.
///
/// Plain settings are public fields. Settings that interact with each other
/// (ranker and match mode, sort mode and sort clause, flags and predicted
/// time) go through setters.
#[derive(Debug, Clone, PartialEq)]
pub struct Search {
    pub query: String,
    /// Comma separated index list, `*` for all.
    pub indexes: String,
    pub comment: String,
    pub offset: i32,
    pub limit: i32,
    pub max_matches: i32,
    pub cutoff: i32,
    pub retry_count: i32,
    pub retry_delay: Duration,
    pub max_query_time: Duration,
    pub match_mode: MatchMode,
    pub field_weights: Vec<(String, i32)>,
    pub index_weights: Vec<(String, i32)>,
    /// Document id range; `0..=0` or `0..=DocId::MAX` means unrestricted.
    pub id_min: DocId,
    pub id_max: DocId,
    pub group_func: GroupFunc,
    pub group_by: String,
    pub group_sort: String,
    pub group_distinct: String,
    pub select: String,
    ranker: RankMode,
    rank_expr: String,
    sort: SortMode,
    sort_by: String,
    filters: Vec<Filter>,
    geo_anchor: Option<GeoAnchor>,
    flags: QueryFlags,
    predicted_time: Duration,
    outer: Option<OuterSelect>,
    token_filter: TokenFilter,
}

impl Default for Search {
    fn default() -> Self {
        Search::new("", "*")
    }
}

impl Search {
    pub fn new(query: impl Into<String>, indexes: impl Into<String>) -> Self {
        Search {
            query: query.into(),
            indexes: indexes.into(),
            comment: String::new(),
            offset: 0,
            limit: 20,
            max_matches: 1000,
            cutoff: 0,
            retry_count: 0,
            retry_delay: Duration::ZERO,
            max_query_time: Duration::ZERO,
            match_mode: MatchMode::All,
            field_weights: Vec::new(),
            index_weights: Vec::new(),
            id_min: DocId(0),
            id_max: DocId(0),
            group_func: GroupFunc::Day,
            group_by: String::new(),
            group_sort: "@group desc".to_string(),
            group_distinct: String::new(),
            select: String::new(),
            ranker: RankMode::ProximityBm25,
            rank_expr: String::new(),
            sort: SortMode::Relevance,
            sort_by: String::new(),
            filters: Vec::new(),
            geo_anchor: None,
            flags: QueryFlags::default(),
            predicted_time: Duration::ZERO,
            outer: None,
            token_filter: TokenFilter::default(),
        }
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn ranking_mode(&self) -> RankMode {
        self.ranker
    }

    pub fn sort_mode(&self) -> (SortMode, &str) {
        (self.sort, &self.sort_by)
    }

    pub fn query_flags(&self) -> QueryFlags {
        self.flags
    }

    /// Adds a filter. Null filters never exclude; `FilterValue::Null(false)`
    /// is how "not null" is expressed.
    pub fn add_filter(&mut self, attribute: impl Into<String>, value: FilterValue, exclude: bool) {
        let exclude = exclude && !matches!(value, FilterValue::Null(_));
        self.filters.push(Filter {
            attribute: attribute.into(),
            value,
            exclude,
        });
    }

    /// Drops every filter and the geo anchor.
    pub fn reset_filters(&mut self) {
        self.filters.clear();
        self.geo_anchor = None;
    }

    /// Enables `@geodist`, computed from the named latitude and longitude
    /// attributes. Coordinates are in radians.
    pub fn set_geo_anchor(&mut self, lat_attr: &str, lon_attr: &str, lat: f32, lon: f32) {
        self.geo_anchor = Some(GeoAnchor {
            lat_attr: lat_attr.to_string(),
            lon_attr: lon_attr.to_string(),
            lat,
            lon,
        });
    }

    /// Groups by `attribute`; `sort` defaults to `@group desc`.
    pub fn set_group_by(&mut self, attribute: &str, func: GroupFunc, sort: Option<&str>) {
        self.group_by = attribute.to_string();
        self.group_func = func;
        self.group_sort = sort.unwrap_or("@group desc").to_string();
    }

    pub fn reset_group_by(&mut self) {
        self.group_by.clear();
        self.group_distinct.clear();
        self.group_sort = "@group desc".to_string();
        self.group_func = GroupFunc::Day;
    }

    pub fn set_query_flags(&mut self, flags: QueryFlags) {
        self.flags.insert(flags);
    }

    /// Sets or clears `flags`. Clearing `MAX_PREDICTED_TIME` also drops the
    /// predicted time limit.
    pub fn change_query_flags(&mut self, flags: QueryFlags, set: bool) {
        if set {
            self.flags.insert(flags);
        } else {
            self.flags.remove(flags);
            if !self.flags.contains(QueryFlags::MAX_PREDICTED_TIME) {
                self.predicted_time = Duration::ZERO;
            }
        }
    }

    pub fn reset_query_flags(&mut self) {
        self.flags = QueryFlags::default();
        self.predicted_time = Duration::ZERO;
    }

    pub fn set_max_predicted_time(&mut self, limit: Duration) {
        self.predicted_time = limit;
        self.flags.insert(QueryFlags::MAX_PREDICTED_TIME);
    }

    pub fn set_outer_select(&mut self, order_by: &str, offset: i32, limit: i32) {
        self.outer = Some(OuterSelect {
            order_by: order_by.to_string(),
            offset,
            limit,
        });
    }

    pub fn reset_outer_select(&mut self) {
        self.outer = None;
    }

    /// Rankers only apply to the extended match modes, so any other match mode
    /// is switched to `Extended2`.
    pub fn set_ranking_mode(&mut self, ranker: RankMode) {
        self.ranker = ranker;
        if !matches!(self.match_mode, MatchMode::Extended | MatchMode::Extended2) {
            self.match_mode = MatchMode::Extended2;
        }
    }

    /// Stores the expression and selects the `Expr` ranker unless an
    /// expression ranker is already set.
    pub fn set_ranking_expression(&mut self, expr: &str) {
        self.rank_expr = expr.to_string();
        if !matches!(self.ranker, RankMode::Expr | RankMode::Export) {
            self.set_ranking_mode(RankMode::Expr);
        }
    }

    /// `sort_by` replaces the current clause when given. With no clause at
    /// all the mode falls back to `Relevance`.
    pub fn set_sort_mode(&mut self, sort: SortMode, sort_by: Option<&str>) {
        self.sort = sort;
        if let Some(sort_by) = sort_by {
            self.sort_by = sort_by.to_string();
        }
        if self.sort_by.is_empty() {
            self.sort = SortMode::Relevance;
        }
    }

    /// Sets a plugin token filter, as library file, function name and options.
    pub fn set_token_filter(&mut self, library: &str, name: &str, options: &str) {
        self.token_filter = TokenFilter {
            library: library.to_string(),
            name: name.to_string(),
            options: options.to_string(),
        };
    }

    fn has_id_range(&self) -> bool {
        self.id_min != DocId(0) || (self.id_max != DocId::MAX && self.id_max != DocId(0))
    }

    fn encode(&self, writer: &mut ApiWriter<'_>) {
        writer.put_u32(self.flags.bits());
        writer.put_i32(self.offset);
        writer.put_i32(self.limit);
        writer.put_u32(self.match_mode as u32);
        writer.put_u32(self.ranker as u32);
        if matches!(self.ranker, RankMode::Expr | RankMode::Export) {
            writer.put_string(&self.rank_expr);
        }
        writer.put_i32(self.sort as i32);
        writer.put_string(&self.sort_by);
        writer.put_string(&self.query);
        // legacy per-field weights, superseded by field_weights below
        writer.put_i32(0);
        writer.put_string(&self.indexes);
        // full id range follows; a narrower one travels as an `@id` filter
        writer.put_i32(1);
        writer.put_docid(DocId(0));
        writer.put_docid(DocId::MAX);

        let id_range = self.has_id_range();
        writer.put_len(self.filters.len() + usize::from(id_range));
        for filter in &self.filters {
            filter.encode(writer);
        }
        if id_range {
            writer.put_string("@id");
            writer.put_u32(ID_RANGE_FILTER);
            writer.put_docid(self.id_min);
            writer.put_docid(self.id_max);
            writer.put_bool_dword(false);
        }

        writer.put_u32(self.group_func as u32);
        writer.put_string(&self.group_by);
        writer.put_i32(self.max_matches);
        writer.put_string(&self.group_sort);
        writer.put_i32(self.cutoff);
        writer.put_i32(self.retry_count);
        writer.put_duration(self.retry_delay);
        writer.put_string(&self.group_distinct);

        writer.put_bool_dword(self.geo_anchor.is_some());
        if let Some(geo) = &self.geo_anchor {
            writer.put_string(&geo.lat_attr);
            writer.put_string(&geo.lon_attr);
            writer.put_f32(geo.lat);
            writer.put_f32(geo.lon);
        }

        put_weights(writer, &self.index_weights);
        writer.put_duration(self.max_query_time);
        put_weights(writer, &self.field_weights);

        writer.put_string(&self.comment);
        // attribute overrides
        writer.put_i32(0);
        writer.put_string(&self.select);

        if self.flags.contains(QueryFlags::MAX_PREDICTED_TIME) {
            writer.put_duration(self.predicted_time);
        }

        match &self.outer {
            Some(outer) => {
                writer.put_string(&outer.order_by);
                writer.put_i32(outer.offset);
                writer.put_i32(outer.limit);
                writer.put_bool_dword(true);
            }
            None => {
                writer.put_string("");
                writer.put_i32(0);
                writer.put_i32(0);
                writer.put_bool_dword(false);
            }
        }

        writer.put_string(&self.token_filter.library);
        writer.put_string(&self.token_filter.name);
        writer.put_string(&self.token_filter.options);

        // filter tree
        writer.put_i32(0);
    }
}

fn put_weights(writer: &mut ApiWriter<'_>, weights: &[(String, i32)]) {
    writer.put_len(weights.len());
    for (name, weight) in weights {
        writer.put_string(name);
        writer.put_i32(*weight);
    }
}

/// Type of a result set attribute, as announced in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    None,
    Integer,
    Timestamp,
    Bool,
    Float,
    Bigint,
    String,
    Poly2d,
    StringPtr,
    TokenCount,
    Json,
    Uint32Set,
    Int64Set,
    MapArg,
    Factors,
    JsonField,
    FactorsJson,
    Other(u32),
}

impl From<u32> for AttrType {
    fn from(code: u32) -> Self {
        match code {
            0 => AttrType::None,
            1 => AttrType::Integer,
            2 => AttrType::Timestamp,
            4 => AttrType::Bool,
            5 => AttrType::Float,
            6 => AttrType::Bigint,
            7 => AttrType::String,
            9 => AttrType::Poly2d,
            10 => AttrType::StringPtr,
            11 => AttrType::TokenCount,
            12 => AttrType::Json,
            0x4000_0001 => AttrType::Uint32Set,
            0x4000_0002 => AttrType::Int64Set,
            1000 => AttrType::MapArg,
            1001 => AttrType::Factors,
            1002 => AttrType::JsonField,
            1003 => AttrType::FactorsJson,
            other => AttrType::Other(other),
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttrType::None => "none",
            AttrType::Integer => "int",
            AttrType::Timestamp => "timestamp",
            AttrType::Bool => "bool",
            AttrType::Float => "float",
            AttrType::Bigint => "bigint",
            AttrType::String => "string",
            AttrType::Poly2d => "poly2d",
            AttrType::StringPtr => "stringptr",
            AttrType::TokenCount => "tokencount",
            AttrType::Json => "json",
            AttrType::Uint32Set => "uint32set",
            AttrType::Int64Set => "int64set",
            AttrType::MapArg => "maparg",
            AttrType::Factors => "factors",
            AttrType::JsonField => "jsonfield",
            AttrType::FactorsJson => "factorsjson",
            AttrType::Other(code) => return write!(f, "unknown({code})"),
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: AttrType,
}

impl fmt::Display for ColumnInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.kind)
    }
}

/// One matched document; `attrs` follows the result's `attrs` schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub doc_id: DocId,
    pub weight: i32,
    pub attrs: Vec<Value>,
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Doc: {}, Weight: {}, attrs: [", self.doc_id, self.weight)?;
        for (i, attr) in self.attrs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{attr}")?;
        }
        f.write_str("]")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WordStat {
    pub word: String,
    pub docs: u32,
    pub hits: u32,
}

impl fmt::Display for WordStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' (Docs:{}, Hits:{})", self.word, self.docs, self.hits)
    }
}

/// Result set of one query in a batch.
///
/// For `Status::Error` and `Status::Retry` only `error` is filled.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub status: Status,
    pub error: String,
    pub warning: String,
    pub fields: Vec<String>,
    pub attrs: Vec<ColumnInfo>,
    pub id64: bool,
    pub matches: Vec<Match>,
    pub total: u32,
    pub total_found: u32,
    pub query_time: Duration,
    pub word_stats: Vec<WordStat>,
}

impl QueryResult {
    fn empty(status: Status) -> Self {
        QueryResult {
            status,
            error: String::new(),
            warning: String::new(),
            fields: Vec::new(),
            attrs: Vec::new(),
            id64: false,
            matches: Vec::new(),
            total: 0,
            total_found: 0,
            query_time: Duration::ZERO,
            word_stats: Vec::new(),
        }
    }

    fn decode(reader: &mut ApiReader<'_>) -> Result<Self, DecodeError> {
        let code = reader.get_u32()?;
        let status = u16::try_from(code)
            .ok()
            .and_then(|c| Status::try_from(c).ok())
            .ok_or_else(|| DecodeError::Malformed(format!("unknown query status {code}")))?;

        let mut result = QueryResult::empty(status);
        match status {
            Status::Error | Status::Retry => {
                result.error = reader.get_string()?;
                return Ok(result);
            }
            Status::Warning => result.warning = reader.get_string()?,
            Status::Ok => {}
        }

        let nfields = reader.get_len()?;
        for _ in 0..nfields {
            result.fields.push(reader.get_string()?);
        }
        let nattrs = reader.get_len()?;
        for _ in 0..nattrs {
            let name = reader.get_string()?;
            let kind = AttrType::from(reader.get_u32()?);
            result.attrs.push(ColumnInfo { name, kind });
        }

        let nmatches = reader.get_len()?;
        result.id64 = reader.get_bool_dword()?;
        for _ in 0..nmatches {
            let doc_id = if result.id64 {
                reader.get_docid()?
            } else {
                DocId(u64::from(reader.get_u32()?))
            };
            let weight = reader.get_i32()?;
            let mut attrs = Vec::with_capacity(result.attrs.len());
            for column in &result.attrs {
                attrs.push(decode_attr(reader, column.kind)?);
            }
            result.matches.push(Match {
                doc_id,
                weight,
                attrs,
            });
        }

        result.total = reader.get_u32()?;
        result.total_found = reader.get_u32()?;
        result.query_time = reader.get_duration()?;

        let nwords = reader.get_len()?;
        for _ in 0..nwords {
            result.word_stats.push(WordStat {
                word: reader.get_string()?,
                docs: reader.get_u32()?,
                hits: reader.get_u32()?,
            });
        }
        trace!(
            "query result: {} matches of {} found",
            result.matches.len(),
            result.total_found
        );
        Ok(result)
    }
}

fn decode_attr(reader: &mut ApiReader<'_>, kind: AttrType) -> Result<Value, DecodeError> {
    Ok(match kind {
        AttrType::Uint32Set => {
            let n = reader.get_len()?;
            let mut values = Vec::new();
            for _ in 0..n {
                values.push(reader.get_u32()?);
            }
            Value::UInt32Set(values)
        }
        AttrType::Int64Set => {
            let n = reader.get_len()?;
            let mut values = Vec::new();
            for _ in 0..n {
                values.push(reader.get_i64()?);
            }
            Value::Int64Set(values)
        }
        AttrType::Float => Value::Float(reader.get_f32()?),
        AttrType::Bigint => Value::Int64(reader.get_i64()?),
        AttrType::String | AttrType::StringPtr => string_attr(reader.get_ref_bytes()?)?,
        AttrType::Json | AttrType::Factors | AttrType::FactorsJson => {
            Value::Bytes(reader.get_bytes()?)
        }
        AttrType::JsonField => Value::Bson(reader.get_bson_field()?),
        AttrType::Timestamp => {
            Value::Timestamp(UNIX_EPOCH + Duration::from_secs(u64::from(reader.get_u32()?)))
        }
        _ => Value::UInt32(reader.get_u32()?),
    })
}

/// Strings may carry a two byte type suffix: a zero byte, then zero for a
/// JSON document or non-zero for plain text.
fn string_attr(raw: &[u8]) -> Result<Value, DecodeError> {
    Ok(match raw {
        [text @ .., 0, kind] => {
            let text = String::from_utf8(text.to_vec())?;
            if *kind == 0 {
                Value::Json(text)
            } else {
                Value::String(text)
            }
        }
        _ => Value::String(String::from_utf8(raw.to_vec())?),
    })
}

/// A batch of searches sent in one request.
#[derive(Debug, Clone, Copy)]
pub struct SearchQueries<'a>(pub &'a [Search]);

impl Request for SearchQueries<'_> {
    fn command(&self) -> Command {
        Command::Search
    }

    fn encode(&self, writer: &mut ApiWriter<'_>) {
        // agent flags, only set between daemons
        writer.put_u32(0);
        writer.put_len(self.0.len());
        for search in self.0 {
            search.encode(writer);
        }
    }
}

impl Query for SearchQueries<'_> {
    type Output = Vec<QueryResult>;

    fn decode(&self, reader: &mut ApiReader<'_>) -> Result<Self::Output, DecodeError> {
        let mut results = Vec::with_capacity(self.0.len());
        for _ in self.0 {
            results.push(QueryResult::decode(reader)?);
        }
        Ok(results)
    }
}
