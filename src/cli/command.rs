/// Programmatic form of the `pagewise` subcommands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Encode a JSON document as an opaque token.
    Encode { json: String },
    /// Decode an opaque token back to JSON.
    Decode { token: String },
    /// Parse a paginator cursor and show its state and neighbouring cursors.
    Inspect { cursor: String },
}
