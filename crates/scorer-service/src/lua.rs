//! Lua script for atomic baseline read-modify-write (spec §4.5 concurrency:
//! "Per-(patient_id, metric) updates must be serialized ... via atomic cache
//! operations (LUA / CAS)").

/// Atomically folds a new sample into the ring buffer stored at `KEYS[1]`
/// and returns the *pre-update* running statistics so the caller can score
/// the sample against the baseline as it stood before this observation.
///
/// Arguments:
/// - `KEYS[1]`: baseline key, e.g. `baseline:{patient_id}:{metric}`
/// - `ARGV[1]`: new sample value
/// - `ARGV[2]`: ring buffer window size
/// - `ARGV[3]`: TTL in seconds applied to the key on every write
///
/// Returns a JSON-encoded `{pre_count, pre_sum, pre_sum_sq}` object.
pub const UPDATE_BASELINE: &str = r#"
local key = KEYS[1]
local new_value = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local ttl = tonumber(ARGV[3])

local raw = redis.call('GET', key)
local state
if raw then
    state = cjson.decode(raw)
else
    state = { values = {}, sum = 0, sum_sq = 0 }
end

local pre_count = #state.values
local pre_sum = state.sum
local pre_sum_sq = state.sum_sq

table.insert(state.values, new_value)
state.sum = state.sum + new_value
state.sum_sq = state.sum_sq + (new_value * new_value)

if #state.values > window then
    local evicted = table.remove(state.values, 1)
    state.sum = state.sum - evicted
    state.sum_sq = state.sum_sq - (evicted * evicted)
end

redis.call('SET', key, cjson.encode(state), 'EX', ttl)

return cjson.encode({ pre_count = pre_count, pre_sum = pre_sum, pre_sum_sq = pre_sum_sq })
"#;
