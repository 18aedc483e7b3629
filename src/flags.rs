use std::path::PathBuf;

xflags::xflags! {
    /// Build, sign and filter RDF context associations.
    cmd ctxassoc {
        /// TOML configuration with identities and timeouts.
        optional -c,--config config: PathBuf

        /// Wrap a document in a context association.
        cmd build {
            /// URL or path of the RDF document.
            required source: String
            /// Do not record the document's graph names as their origin.
            optional --no-graph-origin
            /// Configured identity (name or webId) acting as author.
            optional -i,--identity identity: String
            /// ISO 8601 duration the policy stays valid.
            optional --duration duration: String
            /// Allowed purpose, a DPV name or an IRI.
            repeated --purpose purpose: String
            /// Sign data and metadata with the identity's private key.
            optional --sign
            /// Render RDF lists with collection syntax.
            optional --beautify-lists
            /// Container to POST the association to, or resource to PUT.
            optional --publish url: String
            /// Publish with PUT instead of POST.
            optional --put
            /// Write the association to a file.
            optional -o,--output output: PathBuf
        }

        /// Select data from associations by origin, author and purpose.
        cmd filter {
            /// Association URLs; defaults to those published in this run.
            repeated sources: String
            optional --origin origin: String
            /// Configured identity name or webId.
            optional --author author: String
            optional --purpose purpose: String
            /// Only keep data signed by the author.
            optional --require-signature
        }

        /// Print a new P-384 key pair as JWKs.
        cmd keygen {}

        /// Read commands from standard input.
        cmd repl {}
    }
}
