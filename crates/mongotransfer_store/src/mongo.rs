//! MongoDB collection backend.
//!
//! Reads go through the driver's blocking cursors. Bulk writes are sent as
//! ordered `update` and `delete` database commands, which any server
//! version accepts in a single round trip per command.

use crate::error::{StoreError, StoreResult};
use crate::identifier::{Identifier, ID_FIELD};
use crate::operation::{BulkWriteSummary, WriteOp};
use crate::store::{DocumentStore, DocumentStream, IdentifierStream};
use bson::{doc, Bson, Document};
use mongodb::options::ClientOptions;
use mongodb::sync::{Client, Collection, Database};
use tracing::debug;

/// Largest encoded write command sent in one round trip.
const MAX_COMMAND_BYTES: usize = 16 * 1024 * 1024;

/// Bytes set aside for the command envelope: command name, collection
/// name, `ordered` flag and the statements array header.
const ENVELOPE_RESERVE: usize = 16 * 1024;

/// Largest number of statements the server accepts in one write command.
const MAX_WRITE_STATEMENTS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandKind {
    Update,
    Delete,
}

impl CommandKind {
    fn of(op: &WriteOp) -> Self {
        if op.is_upsert() {
            CommandKind::Update
        } else {
            CommandKind::Delete
        }
    }

    fn name(self) -> &'static str {
        match self {
            CommandKind::Update => "update",
            CommandKind::Delete => "delete",
        }
    }

    fn statements_field(self) -> &'static str {
        match self {
            CommandKind::Update => "updates",
            CommandKind::Delete => "deletes",
        }
    }
}

/// A MongoDB collection.
///
/// # Example
///
/// ```rust,no_run
/// use mongotransfer_store::{DocumentStore, MongoStore};
///
/// let store = MongoStore::connect("mongodb://localhost:27017", "shop", "orders").unwrap();
/// for document in store.scan().unwrap() {
///     println!("{}", document.unwrap());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MongoStore {
    database: Database,
    collection: Collection<Document>,
    servers: Vec<String>,
}

impl MongoStore {
    /// Opens a collection from a connection string.
    ///
    /// The driver connects lazily; an unreachable server surfaces on the
    /// first read or write. `mongodb+srv` strings are resolved here.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string cannot be parsed.
    pub fn connect(uri: &str, database: &str, collection: &str) -> StoreResult<Self> {
        let options = ClientOptions::parse(uri).run()?;
        let servers = options.hosts.iter().map(ToString::to_string).collect();
        let client = Client::with_options(options)?;
        let mut store = Self::from_client(&client, database, collection);
        store.servers = servers;
        Ok(store)
    }

    /// Opens a collection on an existing client.
    ///
    /// The server list is unknown and [`MongoStore::servers`] is empty.
    pub fn from_client(client: &Client, database: &str, collection: &str) -> Self {
        let database = client.database(database);
        let collection = database.collection::<Document>(collection);
        Self {
            database,
            collection,
            servers: Vec::new(),
        }
    }

    /// Server addresses taken from the connection string, as parsed by the
    /// driver. Credentials are never part of them.
    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    fn statement(op: &WriteOp) -> Document {
        match op {
            WriteOp::Upsert(op) => doc! {
                "q": op.filter(),
                "u": op.replacement().clone(),
                "upsert": op.upsert(),
            },
            WriteOp::Delete(op) => doc! {
                "q": op.filter(),
                "limit": 1,
            },
        }
    }

    fn run_write_command(
        &self,
        kind: CommandKind,
        statements: Vec<Document>,
    ) -> StoreResult<BulkWriteSummary> {
        let operations = statements.len();
        let command = write_command(kind, self.collection.name(), statements);

        debug!(
            collection = %self.describe(),
            command = kind.name(),
            operations,
            "sending write command"
        );
        let reply = self.database.run_command(command).run()?;
        check_write_reply(&reply, operations)?;

        let n = reply_count(&reply, "n");
        let summary = match kind {
            CommandKind::Update => {
                let upserted = reply
                    .get_array("upserted")
                    .map(|ids| ids.len() as u64)
                    .unwrap_or(0);
                BulkWriteSummary {
                    matched: n.saturating_sub(upserted),
                    modified: reply_count(&reply, "nModified"),
                    upserted,
                    deleted: 0,
                }
            }
            CommandKind::Delete => BulkWriteSummary {
                deleted: n,
                ..Default::default()
            },
        };
        Ok(summary)
    }
}

impl DocumentStore for MongoStore {
    fn describe(&self) -> String {
        format!("{}.{}", self.database.name(), self.collection.name())
    }

    fn scan(&self) -> StoreResult<DocumentStream<'_>> {
        let cursor = self.collection.find(doc! {}).run()?;
        Ok(Box::new(cursor.map(|document| document.map_err(StoreError::from))))
    }

    fn scan_ids(&self) -> StoreResult<IdentifierStream<'_>> {
        let mut projection = Document::new();
        projection.insert(ID_FIELD, 1);

        let cursor = self.collection.find(doc! {}).projection(projection).run()?;
        let store = self.describe();
        Ok(Box::new(cursor.map(move |document| {
            let document = document?;
            Identifier::of(&document).ok_or_else(|| StoreError::MissingIdentifier {
                store: store.clone(),
            })
        })))
    }

    fn bulk_write(&self, operations: &[WriteOp]) -> StoreResult<BulkWriteSummary> {
        let mut summary = BulkWriteSummary::default();

        for (kind, chunk) in plan_commands(operations)? {
            summary.merge(self.run_write_command(kind, chunk)?);
        }

        Ok(summary)
    }
}

/// Assembles the `update` or `delete` command sent for one chunk.
fn write_command(kind: CommandKind, collection: &str, statements: Vec<Document>) -> Document {
    let mut command = Document::new();
    command.insert(kind.name(), collection);
    command.insert(kind.statements_field(), statements);
    command.insert("ordered", true);
    command
}

/// Encoded size of a statement as element `index` of the statements array:
/// type byte, decimal index key, NUL, then the document itself.
fn element_size(index: usize, statement: &Document) -> StoreResult<usize> {
    let key_len = index.to_string().len();
    Ok(1 + key_len + 1 + bson::to_vec(statement)?.len())
}

/// Splits an ordered batch into write commands.
///
/// Consecutive operations of the same kind share a command. A command is
/// cut only where the server limits would otherwise be exceeded. A single
/// statement larger than the limit still gets a command of its own.
fn plan_commands(operations: &[WriteOp]) -> StoreResult<Vec<(CommandKind, Vec<Document>)>> {
    let mut commands: Vec<(CommandKind, Vec<Document>)> = Vec::new();
    let mut bytes = 0usize;

    for op in operations {
        let kind = CommandKind::of(op);
        let statement = MongoStore::statement(op);

        let start_new = match commands.last() {
            Some((last_kind, statements)) => {
                *last_kind != kind
                    || statements.len() >= MAX_WRITE_STATEMENTS
                    || bytes + element_size(statements.len(), &statement)? > MAX_COMMAND_BYTES
            }
            None => true,
        };

        if start_new {
            commands.push((kind, Vec::new()));
            bytes = ENVELOPE_RESERVE;
        }
        if let Some((_, statements)) = commands.last_mut() {
            bytes += element_size(statements.len(), &statement)?;
            statements.push(statement);
        }
    }

    Ok(commands)
}

fn check_write_reply(reply: &Document, operations: usize) -> StoreResult<()> {
    if let Ok(errors) = reply.get_array("writeErrors") {
        if let Some(first) = errors.first() {
            let message = first
                .as_document()
                .and_then(|error| error.get_str("errmsg").ok())
                .unwrap_or("unknown write error");
            return Err(StoreError::BulkWrite {
                message: format!("{} write error(s), first: {message}", errors.len()),
                operations,
            });
        }
    }

    if let Ok(error) = reply.get_document("writeConcernError") {
        let message = error.get_str("errmsg").unwrap_or("unknown write concern error");
        return Err(StoreError::BulkWrite {
            message: format!("write concern error: {message}"),
            operations,
        });
    }

    Ok(())
}

fn reply_count(reply: &Document, field: &str) -> u64 {
    match reply.get(field) {
        Some(Bson::Int32(n)) => u64::try_from(*n).unwrap_or(0),
        Some(Bson::Int64(n)) => u64::try_from(*n).unwrap_or(0),
        Some(Bson::Double(n)) if *n >= 0.0 => *n as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{DeleteOperation, UpsertOperation};

    fn upsert(id: i32) -> WriteOp {
        WriteOp::Upsert(UpsertOperation::from_document(doc! { "_id": id, "v": "x" }).unwrap())
    }

    fn delete(id: i32) -> WriteOp {
        WriteOp::Delete(DeleteOperation::new(Identifier::new(id)))
    }

    #[test]
    fn upsert_statement_shape() {
        let statement = MongoStore::statement(&upsert(1));
        assert_eq!(
            statement,
            doc! { "q": { "_id": 1 }, "u": { "_id": 1, "v": "x" }, "upsert": true }
        );
    }

    #[test]
    fn delete_statement_shape() {
        let statement = MongoStore::statement(&delete(4));
        assert_eq!(statement, doc! { "q": { "_id": 4 }, "limit": 1 });
    }

    #[test]
    fn homogeneous_batch_is_one_command() {
        let ops: Vec<_> = (0..10).map(upsert).collect();
        let commands = plan_commands(&ops).unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].0, CommandKind::Update);
        assert_eq!(commands[0].1.len(), 10);
    }

    #[test]
    fn mixed_batch_keeps_order() {
        let ops = vec![upsert(1), upsert(2), delete(3), upsert(4)];
        let kinds: Vec<_> = plan_commands(&ops)
            .unwrap()
            .into_iter()
            .map(|(kind, statements)| (kind, statements.len()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (CommandKind::Update, 2),
                (CommandKind::Delete, 1),
                (CommandKind::Update, 1)
            ]
        );
    }

    #[test]
    fn oversized_batch_is_split_by_bytes() {
        let payload = "x".repeat(4 * 1024 * 1024);
        let ops: Vec<_> = (0..5)
            .map(|id| {
                WriteOp::Upsert(
                    UpsertOperation::from_document(doc! { "_id": id, "blob": payload.clone() })
                        .unwrap(),
                )
            })
            .collect();
        let commands = plan_commands(&ops).unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].1.len() + commands[1].1.len(), 5);
    }

    #[test]
    fn many_small_statements_fit_the_command_limit() {
        let payload = "x".repeat(360);
        let ops: Vec<_> = (0..50_000)
            .map(|id| {
                WriteOp::Upsert(
                    UpsertOperation::from_document(doc! { "_id": id, "p": payload.clone() })
                        .unwrap(),
                )
            })
            .collect();

        let commands = plan_commands(&ops).unwrap();
        assert!(commands.len() > 1);

        let mut next_id = 0;
        for (kind, statements) in commands {
            for statement in &statements {
                assert_eq!(statement.get_document("q").unwrap().get_i32("_id").unwrap(), next_id);
                next_id += 1;
            }
            let command = write_command(kind, "orders", statements);
            let size = bson::to_vec(&command).unwrap().len();
            assert!(size <= MAX_COMMAND_BYTES, "command of {size} bytes");
        }
        assert_eq!(next_id, 50_000);
    }

    #[test]
    fn statement_count_limit_splits_command() {
        let ops: Vec<_> = (0..MAX_WRITE_STATEMENTS as i32 + 1).map(delete).collect();
        let commands = plan_commands(&ops).unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].1.len(), MAX_WRITE_STATEMENTS);
        assert_eq!(commands[1].1.len(), 1);
    }

    #[test]
    fn write_command_shape() {
        let statement = MongoStore::statement(&delete(1));
        let command = write_command(CommandKind::Delete, "orders", vec![statement]);
        assert_eq!(
            command,
            doc! {
                "delete": "orders",
                "deletes": [{ "q": { "_id": 1 }, "limit": 1 }],
                "ordered": true,
            }
        );
    }

    #[test]
    fn empty_batch_has_no_commands() {
        assert!(plan_commands(&[]).unwrap().is_empty());
    }

    #[test]
    fn write_errors_fail_the_call() {
        let reply = doc! {
            "ok": 1,
            "n": 1,
            "writeErrors": [{ "index": 1, "code": 11000, "errmsg": "E11000 duplicate key" }],
        };
        let err = check_write_reply(&reply, 2).unwrap_err();
        assert!(err.to_string().contains("E11000"));
    }

    #[test]
    fn write_concern_error_fails_the_call() {
        let reply = doc! { "ok": 1, "n": 2, "writeConcernError": { "errmsg": "timeout" } };
        assert!(check_write_reply(&reply, 2).is_err());
    }

    #[test]
    fn clean_reply_passes() {
        let reply = doc! { "ok": 1, "n": 3, "nModified": 1 };
        assert!(check_write_reply(&reply, 3).is_ok());
        assert_eq!(reply_count(&reply, "n"), 3);
        assert_eq!(reply_count(&reply, "nModified"), 1);
        assert_eq!(reply_count(&reply, "missing"), 0);
    }
}
