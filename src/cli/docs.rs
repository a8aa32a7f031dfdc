//! Documentation content for the quarry CLI

use super::CliError;

/// Available documentation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocCategory {
    Syntax,
    Strands,
    Blocks,
    Transactions,
    Storage,
    Operators,
    Functions,
}

impl DocCategory {
    /// Parse a category name, accepting a few aliases
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "syntax" => Some(Self::Syntax),
            "strands" | "strand" | "strings" => Some(Self::Strands),
            "blocks" | "block" | "return" => Some(Self::Blocks),
            "transactions" | "transaction" | "txn" => Some(Self::Transactions),
            "storage" | "records" => Some(Self::Storage),
            "operators" | "ops" => Some(Self::Operators),
            "functions" | "builtins" => Some(Self::Functions),
            _ => None,
        }
    }
}

/// Get the docs overview (category listing)
pub fn get_docs_overview() -> &'static str {
    r#"QUARRY DOCUMENTATION

Quarry is a transactional query language. A query is a sequence of
statements separated by ';'. Every value-producing statement adds one entry
to the result.

DOCUMENTATION CATEGORIES

  syntax            Statements, variables, comments and reserved words
  strands           Plain and typed string literals
  blocks            Block values, the trailing ';' rule, RETURN and THROW
  transactions      BEGIN, COMMIT and CANCEL, nested and early-returned
  storage           CREATE, UPDATE, DELETE and SELECT
  operators         Arithmetic, comparison, logic and KNN<k>
  functions         Built-in functions

QUICK REFERENCE

  LET $x = 1            Bind a variable
  { a; b }              Block evaluating to b
  { a; b; }             Block evaluating to null
  {"k": 1}              Object (keys are quoted)
  r"person:tobie"       Record id
  BEGIN; ...; COMMIT    Transaction

Run 'quarry doc <category>' for detailed documentation.
"#
}

/// Get documentation for a specific category
pub fn get_doc_category(name: &str) -> Result<&'static str, CliError> {
    match DocCategory::from_name(name) {
        Some(DocCategory::Syntax) => Ok(SYNTAX_DOC),
        Some(DocCategory::Strands) => Ok(STRANDS_DOC),
        Some(DocCategory::Blocks) => Ok(BLOCKS_DOC),
        Some(DocCategory::Transactions) => Ok(TRANSACTIONS_DOC),
        Some(DocCategory::Storage) => Ok(STORAGE_DOC),
        Some(DocCategory::Operators) => Ok(OPERATORS_DOC),
        Some(DocCategory::Functions) => Ok(FUNCTIONS_DOC),
        None => Err(CliError::UnknownCategory(name.to_string())),
    }
}

const SYNTAX_DOC: &str = r#"SYNTAX - Statements and Names

STATEMENTS
  Statements are separated by ';'. A trailing ';' is allowed.

    LET $name = expr            Bind in the current block
    RETURN expr                 End the innermost block with a value
    THROW expr                  End the innermost block with a failure
    FOR $item IN expr { ... }   Iterate an array
    BEGIN / COMMIT / CANCEL     Transactions (see 'quarry doc transactions')
    expr                        Any expression

VARIABLES
  $name
    Reads walk outward through enclosing blocks. An unbound variable
    reads as null (or as a failure with --unbound failure).

IDENTIFIERS
  person, first_name, `any text`
    Bare identifiers start with a letter or '_'. They can never start
    with a digit: 10dec is always a number.

    In an expression a bare identifier reads the field of the same name
    on $this, the record being filtered or updated.

RESERVED WORDS
  Keywords are case-insensitive. A keyword cannot be used where a name is
  expected; surround it with backticks instead:

    CREATE `select`             Table named select

  After '.' and in SET paths keywords are accepted as field names:

    $doc.from                   Field named from

COMMENTS
  // to end of line
  /* block */
"#;

const STRANDS_DOC: &str = r#"STRANDS - String Literals

PLAIN
  "text"  'text'  s"text"
    A plain strand is always a string, whatever it contains.
    "2024-01-01" is a string, not a datetime.

TYPED
  d"2024-05-01T10:00:00Z"       Datetime (date, optional time and offset)
  u"0190c9a8-5fd4-7c43-9e2f-0a1b2c3d4e5f"
                                Uuid
  r"person:tobie"               Record id (table:key)

    Typed strands are checked when the query is read; an invalid one is
    a lex error, before anything runs.

ESCAPES
  \n  \t  \r  \\  \"  \'
"#;

const BLOCKS_DOC: &str = r#"BLOCKS - Values, ';' and Early Return

BLOCK VALUE
  { 1; 2 }          2
  { 1; 2; }         null

    A block evaluates to its last statement's value. A trailing ';'
    suppresses that value. The same rule decides a query's final value.

BLOCK OR OBJECT
  {}                Empty object
  {"a": 1}          Object
  { $a }            Block
  { a: 1 }          Error: quote the key for an object

RETURN
  RETURN ends the innermost block, not the whole query:

    { { RETURN 1; }; RETURN 2; }       2

  At the top level it adds its value to the result and ends the query.

THROW
  THROW expr is RETURN with a failure value. Failures flow through
  operators; use is_failure() or unwrap_or() to handle them:

    unwrap_or({ THROW "bad" }, 0)      0

IF
  IF cond { ... } ELSE IF cond { ... } ELSE { ... }
    Evaluates to the taken branch's value, or null.
"#;

const TRANSACTIONS_DOC: &str = r#"TRANSACTIONS - BEGIN, COMMIT, CANCEL

BASICS
  BEGIN;
  LET $p = CREATE person;
  COMMIT;

    Writes and variable changes made after BEGIN are kept in a journal.
    COMMIT applies them; CANCEL undoes them. Outside a transaction every
    write is applied immediately.

PAIRING
  A transaction is closed only by a COMMIT or CANCEL in the same
  statement sequence as its BEGIN. A BEGIN without one is an error.

NESTED CANCEL
  BEGIN;
  IF $bad { CANCEL };
  COMMIT;

    A CANCEL inside a nested block marks the open transaction. Its
    COMMIT then rolls everything back instead.

CANCEL THEN COMMIT
  BEGIN; LET $p = CREATE foo; CANCEL; RETURN $p; COMMIT;

    The CANCEL rolls back at once, so RETURN sees $p unbound (null).
    A later COMMIT in the same sequence has no effect.

NESTED TRANSACTIONS
  A committed inner transaction merges into the enclosing one; rolling
  the outer one back also undoes the inner work.

EARLY RETURN
  A transaction still open when its block returns is rolled back.
"#;

const STORAGE_DOC: &str = r#"STORAGE - Records

CREATE
  CREATE person                          Random key
  CREATE r"person:tobie" CONTENT {"age": 32}
    Evaluates to the new record, including its id.

UPDATE
  UPDATE r"person:tobie" SET age = age + 1, tags[0] = "x"
  UPDATE person CONTENT {"active": true}
    A record target yields the updated record (or null if missing); a
    table target yields an array of updated records.

DELETE
  DELETE r"person:tobie"
  DELETE person

SELECT
  SELECT * FROM person WHERE age >= 18
    Evaluates to an array. WHERE is checked with $this bound to each
    record.

TARGETS
  A table name, a record id strand, or a variable holding a record id,
  a table name or a record.
"#;

const OPERATORS_DOC: &str = r#"OPERATORS - Arithmetic, Comparison, Logic

ARITHMETIC
  +  -  *  /  %
    Integers stay integers (overflow is a failure). Mixing an integer and
    a float keeps an integer when the result is whole. Any decimal operand
    makes the result a decimal. '+' also joins strings and arrays.
    Division by zero is a failure value.

COMPARISON
  ==  !=  <  <=  >  >=
    Numbers compare by value across types. Chaining (a < b < c) is a
    syntax error.

LOGIC
  AND &&   OR ||   NOT !
    Operands are judged by truthiness; the right side is only evaluated
    when needed.

NULL COALESCING
  a ?? b            b when a is null

NEAREST NEIGHBOURS
  $points KNN<2> [0, 0]
    The 2 vectors of $points closest to [0, 0], nearest first.
"#;

const FUNCTIONS_DOC: &str = r#"FUNCTIONS - Built-ins

  len(v)              Length of an array, string or object
  type_of(v)          Type name as a string
  fail(v)             Failure carrying v
  is_failure(v)       true for failure values
  unwrap_or(v, d)     d when v is a failure or null, else v
  uuid()              Random uuid
  matches(s, re)      Regular expression match
  upper(s)  lower(s)  Change case
  keys(o)             Sorted keys of an object

  Unknown functions and wrong argument counts are reported before the
  query runs.
"#;
