//! PostgreSQL SQLSTATE code -> human-readable message table (§4.8).
//!
//! Ported verbatim from `orm/postgres/driver/sqlstate.py`'s
//! `SQLSTATE_MESSAGES` dict.

use std::collections::HashMap;

use once_cell::sync::Lazy;

pub static SQLSTATE_MESSAGES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
        m.insert("00000", "successful completion");
        m.insert("01000", "warning");
        m.insert("0100C", "dynamic result sets returned");
        m.insert("01008", "implicit zero bit padding");
        m.insert("01003", "null value eliminated in set function");
        m.insert("01007", "privilege not granted");
        m.insert("01006", "privilege not revoked");
        m.insert("01004", "string data right truncation");
        m.insert("01P01", "deprecated feature");
        m.insert("02000", "no data");
        m.insert("02001", "no additional dynamic result sets returned");
        m.insert("03000", "sql statement not yet complete");
        m.insert("08000", "connection exception");
        m.insert("08003", "connection does not exist");
        m.insert("08006", "connection failure");
        m.insert("08001", "sqlclient unable to establish sqlconnection");
        m.insert("08004", "sqlserver rejected establishment of sqlconnection");
        m.insert("08007", "transaction resolution unknown");
        m.insert("08P01", "protocol violation");
        m.insert("09000", "triggered action exception");
        m.insert("0A000", "feature not supported");
        m.insert("0B000", "invalid transaction initiation");
        m.insert("0F000", "locator exception");
        m.insert("0F001", "invalid locator specification");
        m.insert("0L000", "invalid grantor");
        m.insert("0LP01", "invalid grant operation");
        m.insert("0P000", "invalid role specification");
        m.insert("0Z000", "diagnostics exception");
        m.insert("0Z002", "stacked diagnostics accessed without active handler");
        m.insert("20000", "case not found");
        m.insert("21000", "cardinality violation");
        m.insert("22000", "data exception");
        m.insert("2202E", "array subscript error");
        m.insert("22021", "character not in repertoire");
        m.insert("22008", "datetime field overflow");
        m.insert("22012", "division by zero");
        m.insert("22005", "error in assignment");
        m.insert("2200B", "escape character conflict");
        m.insert("22022", "indicator overflow");
        m.insert("22015", "interval field overflow");
        m.insert("2201E", "invalid argument for logarithm");
        m.insert("22014", "invalid argument for ntile function");
        m.insert("22016", "invalid argument for nth value function");
        m.insert("2201F", "invalid argument for power function");
        m.insert("2201G", "invalid argument for width bucket function");
        m.insert("22018", "invalid character value for cast");
        m.insert("22007", "invalid datetime format");
        m.insert("22019", "invalid escape character");
        m.insert("2200D", "invalid escape octet");
        m.insert("22025", "invalid escape sequence");
        m.insert("22P06", "nonstandard use of escape character");
        m.insert("22010", "invalid indicator parameter value");
        m.insert("22023", "invalid parameter value");
        m.insert("22013", "invalid preceding or following size");
        m.insert("2201B", "invalid regular expression");
        m.insert("2201W", "invalid row count in limit clause");
        m.insert("2201X", "invalid row count in result offset clause");
        m.insert("2202H", "invalid tablesample argument");
        m.insert("2202G", "invalid tablesample repeat");
        m.insert("22009", "invalid time zone displacement value");
        m.insert("2200C", "invalid use of escape character");
        m.insert("2200G", "most specific type mismatch");
        m.insert("22004", "null value not allowed");
        m.insert("22002", "null value no indicator parameter");
        m.insert("22003", "numeric value out of range");
        m.insert("2200H", "sequence generator limit exceeded");
        m.insert("22026", "string data length mismatch");
        m.insert("22001", "string data right truncation");
        m.insert("22011", "substring error");
        m.insert("22027", "trim error");
        m.insert("22024", "unterminated C string");
        m.insert("2200F", "zero length character string");
        m.insert("22P01", "floating point exception");
        m.insert("22P02", "invalid text representation");
        m.insert("22P03", "invalid binary representation");
        m.insert("22P04", "bad copy file format");
        m.insert("22P05", "untranslatable character");
        m.insert("2200L", "not an xml document");
        m.insert("2200M", "invalid xml document");
        m.insert("2200N", "invalid xml content");
        m.insert("2200S", "invalid xml comment");
        m.insert("2200T", "invalid xml processing instruction");
        m.insert("22030", "duplicate json object key value");
        m.insert("22031", "invalid argument for sql json datetime function");
        m.insert("22032", "invalid json text");
        m.insert("22033", "invalid sql json subscript");
        m.insert("22034", "more than one sql json item");
        m.insert("22035", "no sql json item");
        m.insert("22036", "non numeric sql json item");
        m.insert("22037", "non unique keys in a json object");
        m.insert("22038", "singleton sql json item required");
        m.insert("22039", "sql json array not found");
        m.insert("2203A", "sql json member not found");
        m.insert("2203B", "sql json number not found");
        m.insert("2203C", "sql json object not found");
        m.insert("2203D", "too many json array elements");
        m.insert("2203E", "too many json object members");
        m.insert("2203F", "sql json scalar required");
        m.insert("2203G", "sql json item cannot be cast to target type");
        m.insert("23000", "integrity constraint violation");
        m.insert("23001", "restrict violation");
        m.insert("23502", "not null violation");
        m.insert("23503", "foreign key violation");
        m.insert("23505", "unique violation");
        m.insert("23514", "check violation");
        m.insert("23P01", "exclusion violation");
        m.insert("24000", "invalid cursor state");
        m.insert("25000", "invalid transaction state");
        m.insert("25001", "active sql transaction");
        m.insert("25002", "branch transaction already active");
        m.insert("25008", "held cursor requires same isolation level");
        m.insert("25003", "inappropriate access mode for branch transaction");
        m.insert("25004", "inappropriate isolation level for branch transaction");
        m.insert("25005", "no active sql transaction for branch transaction");
        m.insert("25006", "read only sql transaction");
        m.insert("25007", "schema and data statement mixing not supported");
        m.insert("25P01", "no active sql transaction");
        m.insert("25P02", "in failed sql transaction");
        m.insert("25P03", "idle in transaction session timeout");
        m.insert("25P04", "transaction timeout");
        m.insert("26000", "invalid sql statement name");
        m.insert("27000", "triggered data change violation");
        m.insert("28000", "invalid authorization specification");
        m.insert("28P01", "invalid password");
        m.insert("2B000", "dependent privilege descriptors still exist");
        m.insert("2BP01", "dependent objects still exist");
        m.insert("2D000", "invalid transaction termination");
        m.insert("2F000", "sql routine exception");
        m.insert("2F005", "function executed no return statement");
        m.insert("2F002", "modifying sql data not permitted");
        m.insert("2F003", "prohibited sql statement attempted");
        m.insert("2F004", "reading sql data not permitted");
        m.insert("34000", "invalid cursor name");
        m.insert("38000", "external routine exception");
        m.insert("38001", "containing sql not permitted");
        m.insert("38002", "modifying sql data not permitted");
        m.insert("38003", "prohibited sql statement attempted");
        m.insert("38004", "reading sql data not permitted");
        m.insert("39000", "external routine invocation exception");
        m.insert("39001", "invalid sqlstate returned");
        m.insert("39004", "null value not allowed");
        m.insert("39P01", "trigger protocol violated");
        m.insert("39P02", "srf protocol violated");
        m.insert("39P03", "event trigger protocol violated");
        m.insert("3B000", "savepoint exception");
        m.insert("3B001", "invalid savepoint specification");
        m.insert("3D000", "invalid catalog name");
        m.insert("3F000", "invalid schema name");
        m.insert("40000", "transaction rollback");
        m.insert("40001", "serialization failure");
        m.insert("40002", "transaction integrity constraint violation");
        m.insert("40003", "statement completion unknown");
        m.insert("40P01", "deadlock detected");
        m.insert("42000", "syntax error or access rule violation");
        m.insert("42601", "syntax error");
        m.insert("42501", "insufficient privilege");
        m.insert("42846", "cannot coerce");
        m.insert("42803", "grouping error");
        m.insert("42P20", "windowing error");
        m.insert("42P19", "invalid recursion");
        m.insert("42830", "invalid foreign key");
        m.insert("42602", "invalid name");
        m.insert("42622", "name too long");
        m.insert("42939", "reserved name");
        m.insert("42804", "datatype mismatch");
        m.insert("42P18", "indeterminate datatype");
        m.insert("42P21", "collation mismatch");
        m.insert("42P22", "indeterminate collation");
        m.insert("42809", "wrong object type");
        m.insert("428C9", "generated always");
        m.insert("42703", "undefined column");
        m.insert("42883", "undefined function");
        m.insert("42P01", "undefined table");
        m.insert("42P02", "undefined parameter");
        m.insert("42704", "undefined object");
        m.insert("42701", "duplicate column");
        m.insert("42P03", "duplicate cursor");
        m.insert("42P04", "duplicate database");
        m.insert("42723", "duplicate function");
        m.insert("42P05", "duplicate prepared statement");
        m.insert("42P06", "duplicate schema");
        m.insert("42P07", "duplicate table");
        m.insert("42712", "duplicate alias");
        m.insert("42710", "duplicate object");
        m.insert("42702", "ambiguous column");
        m.insert("42725", "ambiguous function");
        m.insert("42P08", "ambiguous parameter");
        m.insert("42P09", "ambiguous alias");
        m.insert("42P10", "invalid column reference");
        m.insert("42611", "invalid column definition");
        m.insert("42P11", "invalid cursor definition");
        m.insert("42P12", "invalid database definition");
        m.insert("42P13", "invalid function definition");
        m.insert("42P14", "invalid prepared statement definition");
        m.insert("42P15", "invalid schema definition");
        m.insert("42P16", "invalid table definition");
        m.insert("42P17", "invalid object definition");
        m.insert("44000", "with check option violation");
        m.insert("53000", "insufficient resources");
        m.insert("53100", "disk full");
        m.insert("53200", "out of memory");
        m.insert("53300", "too many connections");
        m.insert("53400", "configuration limit exceeded");
        m.insert("54000", "program limit exceeded");
        m.insert("54001", "statement too complex");
        m.insert("54011", "too many columns");
        m.insert("54023", "too many arguments");
        m.insert("55000", "object not in prerequisite state");
        m.insert("55006", "object in use");
        m.insert("55P02", "cant change runtime param");
        m.insert("55P03", "lock not available");
        m.insert("55P04", "unsafe new enum value usage");
        m.insert("57000", "operator intervention");
        m.insert("57014", "query canceled");
        m.insert("57P01", "admin shutdown");
        m.insert("57P02", "crash shutdown");
        m.insert("57P03", "cannot connect now");
        m.insert("57P04", "database dropped");
        m.insert("57P05", "idle session timeout");
        m.insert("58000", "system error");
        m.insert("58030", "io error");
        m.insert("58P01", "undefined file");
        m.insert("58P02", "duplicate file");
        m.insert("F0000", "config file error");
        m.insert("F0001", "lock file exists");
        m.insert("HV000", "fdw error");
        m.insert("HV005", "fdw column name not found");
        m.insert("HV002", "fdw dynamic parameter value needed");
        m.insert("HV010", "fdw function sequence error");
        m.insert("HV021", "fdw inconsistent descriptor information");
        m.insert("HV024", "fdw invalid attribute value");
        m.insert("HV007", "fdw invalid column name");
        m.insert("HV008", "fdw invalid column number");
        m.insert("HV004", "fdw invalid data type");
        m.insert("HV006", "fdw invalid data type descriptors");
        m.insert("HV091", "fdw invalid descriptor field identifier");
        m.insert("HV00B", "fdw invalid handle");
        m.insert("HV00C", "fdw invalid option index");
        m.insert("HV00D", "fdw invalid option name");
        m.insert("HV090", "fdw invalid string length or buffer length");
        m.insert("HV00A", "fdw invalid string format");
        m.insert("HV009", "fdw invalid use of null pointer");
        m.insert("HV014", "fdw too many handles");
        m.insert("HV001", "fdw out of memory");
        m.insert("HV00P", "fdw no schemas");
        m.insert("HV00J", "fdw option name not found");
        m.insert("HV00K", "fdw reply handle");
        m.insert("HV00Q", "fdw schema not found");
        m.insert("HV00R", "fdw table not found");
        m.insert("HV00L", "fdw unable to create execution");
        m.insert("HV00M", "fdw unable to create reply");
        m.insert("HV00N", "fdw unable to establish connection");
        m.insert("P0000", "plpgsql error");
        m.insert("P0001", "raise exception");
        m.insert("P0002", "no data found");
        m.insert("P0003", "too many rows");
        m.insert("P0004", "assert failure");
        m.insert("XX000", "internal error");
        m.insert("XX001", "data corrupted");
        m.insert("XX002", "index corrupted");
    m
});

/// Look up the human-readable description for a SQLSTATE code, falling
/// back to the same placeholder the original driver used for unknown codes.
pub fn describe(sqlstate: &str) -> &'static str {
    SQLSTATE_MESSAGES
        .get(sqlstate)
        .copied()
        .unwrap_or("unknown SQLSTATE error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_code_resolves_to_its_message() {
        assert_eq!(describe("23505"), "unique violation");
        assert_eq!(describe("42P01"), "undefined table");
    }

    #[test]
    fn unknown_code_falls_back_to_placeholder() {
        assert_eq!(describe("ZZZZZ"), "unknown SQLSTATE error");
    }

    #[test]
    fn table_has_all_ported_entries() {
        assert_eq!(SQLSTATE_MESSAGES.len(), 260);
    }
}
