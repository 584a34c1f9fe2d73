//! Static catalog of known library functions.
//!
//! This describes library functions to the symbol ingester by name, not by
//! how they appear in any particular symbol table. Matching a catalog entry
//! only adds tag bits; it never decides which module a function lands in.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::model::Tags;

/// A known library function and its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryFunc {
    pub name: &'static str,
    pub tags: Tags,
}

const LIB: Tags = Tags::LIB_FUNC;

const fn entry(name: &'static str, extra: Tags) -> LibraryFunc {
    LibraryFunc { name, tags: LIB.union(extra) }
}

static LIBRARY_FUNCS: &[LibraryFunc] = &[
    // Output.
    entry("write", Tags::IO_OUT),
    entry("writev", Tags::IO_OUT),
    entry("fwrite", Tags::IO_OUT),
    entry("printf", Tags::IO_OUT),
    entry("fprintf", Tags::IO_OUT),
    entry("puts", Tags::IO_OUT),
    entry("fputs", Tags::IO_OUT),
    entry("putchar", Tags::IO_OUT),
    entry("fflush", Tags::IO_OUT),
    // Input.
    entry("read", Tags::IO_IN),
    entry("readv", Tags::IO_IN),
    entry("fread", Tags::IO_IN),
    entry("scanf", Tags::IO_IN),
    entry("fscanf", Tags::IO_IN),
    entry("fgets", Tags::IO_IN),
    entry("getchar", Tags::IO_IN),
    // Message passing.
    entry("send", Tags::MSG_SEND),
    entry("sendto", Tags::MSG_SEND),
    entry("sendmsg", Tags::MSG_SEND),
    entry("pvm_send", Tags::MSG_SEND),
    entry("pvm_mcast", Tags::MSG_SEND),
    entry("CMMD_send_block", Tags::MSG_SEND),
    entry("recv", Tags::MSG_RECV.union(Tags::CPU_STATE)),
    entry("recvfrom", Tags::MSG_RECV.union(Tags::CPU_STATE)),
    entry("recvmsg", Tags::MSG_RECV.union(Tags::CPU_STATE)),
    entry("pvm_recv", Tags::MSG_RECV.union(Tags::CPU_STATE)),
    entry("pvm_nrecv", Tags::MSG_RECV),
    entry("CMMD_receive_block", Tags::MSG_RECV.union(Tags::CPU_STATE)),
    entry("pvm_upkint", Tags::MSG_FILT),
    entry("pvm_pkint", Tags::MSG_FILT),
    // Synchronization.
    entry("pthread_mutex_init", Tags::SYNC_FUNC),
    entry("pthread_mutex_lock", Tags::SYNC_FUNC.union(Tags::CPU_STATE)),
    entry("pthread_mutex_unlock", Tags::SYNC_FUNC),
    entry("pthread_mutex_destroy", Tags::SYNC_FUNC),
    entry("pthread_cond_wait", Tags::SYNC_FUNC.union(Tags::CPU_STATE)),
    entry("pthread_join", Tags::SYNC_FUNC.union(Tags::CPU_STATE)),
    entry("CMMD_sync_with_nodes", Tags::SYNC_FUNC.union(Tags::CPU_STATE)),
    // Blocking on external events.
    entry("select", Tags::CPU_STATE),
    entry("poll", Tags::CPU_STATE),
    entry("sleep", Tags::CPU_STATE),
    entry("usleep", Tags::CPU_STATE),
    entry("wait", Tags::CPU_STATE),
    entry("waitpid", Tags::CPU_STATE),
    // Plain library code.
    entry("malloc", Tags::NONE),
    entry("free", Tags::NONE),
    entry("memcpy", Tags::NONE),
    entry("memset", Tags::NONE),
    entry("strcpy", Tags::NONE),
    entry("strlen", Tags::NONE),
    entry("exit", Tags::NONE),
    entry("_exit", Tags::NONE),
    entry("abort", Tags::NONE),
];

/// Name-keyed, read-only view over the process-wide library catalog.
#[derive(Debug)]
pub struct LibraryCatalog {
    by_name: HashMap<&'static str, LibraryFunc>,
}

impl LibraryCatalog {
    /// The shared catalog.
    pub fn global() -> &'static LibraryCatalog {
        static CATALOG: OnceLock<LibraryCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| LibraryCatalog {
            by_name: LIBRARY_FUNCS.iter().map(|f| (f.name, *f)).collect(),
        })
    }

    pub fn lookup(&self, name: &str) -> Option<&LibraryFunc> {
        self.by_name.get(name)
    }

    /// Tag bits for `name`, or `Tags::NONE` if it is not catalogued.
    pub fn tags_for(&self, name: &str) -> Tags {
        self.lookup(name).map(|f| f.tags).unwrap_or(Tags::NONE)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
