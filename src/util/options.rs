//! Options that control which barrier concerns are active.
//!
//! Every option has a type, a validator and a default.  `Options::default()` starts from the
//! defaults and then applies environment variables named `EVAC_BARRIER_<OPTION>`, e.g.
//! `EVAC_BARRIER_SATB_BUFFER_SIZE=256`.  A runtime can also set options programmatically
//! through [`crate::BarrierSetBuilder::set_option`] before building the barrier set.

use crate::util::constants::*;

fn always_valid<T>(_: &T) -> bool {
    true
}

macro_rules! options {
    ($($(#[$outer:meta])* $name:ident: $type:ty[$validator:expr] = $default:expr),*,) => [
        options!($($(#[$outer])* $name: $type[$validator] = $default),*);
    ];
    ($($(#[$outer:meta])* $name:ident: $type:ty[$validator:expr] = $default:expr),*) => [
        /// The option table of a barrier set.
        #[derive(Clone, Debug)]
        pub struct Options {
            $($(#[$outer])* pub $name: $type),*
        }
        impl Options {
            /// Set an option from its snake-case name and a string value.
            /// Returns false if the value cannot be parsed or fails validation, in which case
            /// the option keeps its current value.
            ///
            /// Panics if `s` does not name an option.
            pub fn set_from_str(&mut self, s: &str, val: &str) -> bool {
                match s {
                    // Parse the given value from str (by env vars or by calling set_option()) to the right type
                    $(stringify!($name) => if let Ok(ref val) = val.parse::<$type>() {
                        let validate_fn = $validator;
                        let is_valid = validate_fn(val);
                        if is_valid {
                            // Only set value if valid.
                            self.$name = val.clone();
                        } else {
                            warn!("Unable to set {}={:?}. Invalid value. Default value will be used.", s, val);
                        }
                        is_valid
                    } else {
                        warn!("Unable to set {}={:?}. Cant parse value. Default value will be used.", s, val);
                        false
                    })*
                    _ => panic!("Invalid Options key: {}", s)
                }
            }

            /// Is `s` the name of an option?
            pub fn is_option(s: &str) -> bool {
                matches!(s, $(stringify!($name))|*)
            }

            /// The defaults, without looking at environment variables.
            pub fn builtin_defaults() -> Self {
                Options {
                    $($name: $default),*
                }
            }
        }
        impl Default for Options {
            fn default() -> Self {
                let mut options = Self::builtin_defaults();

                // If we have env vars that start with EVAC_BARRIER_ and match any option (such as
                // EVAC_BARRIER_SATB_BARRIER), we set the option to its value (if it is a valid
                // value). Otherwise, use the default value.
                const PREFIX: &str = "EVAC_BARRIER_";
                for (key, val) in std::env::vars() {
                    // strip the prefix, and get the lower case string
                    if let Some(rest_of_key) = key.strip_prefix(PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        if Self::is_option(lowercase) {
                            options.set_from_str(lowercase, &val);
                        }
                    }
                }
                options
            }
        }
    ]
}

options! {
    /// Enqueue the previous value of overwritten slots while concurrent marking is in progress.
    satb_barrier:          bool   [always_valid] = true,
    /// Record region-to-region connections in the connection matrix on every reference store.
    connection_matrix:     bool   [always_valid] = false,
    /// Capacity (in entries) of the thread-local snapshot buffer before it is handed over.
    satb_buffer_size:      usize  [|v: &usize| *v > 0] = DEFAULT_SATB_BUFFER_SIZE,
    /// log2 of the region size in bytes.
    log_bytes_in_region:   usize  [|v: &usize| (MIN_LOG_BYTES_IN_REGION..=MAX_LOG_BYTES_IN_REGION).contains(v)] = DEFAULT_LOG_BYTES_IN_REGION,
    /// Count barrier events in `BarrierStats`.
    barrier_stats:         bool   [always_valid] = false,
}

impl Options {
    /// The region size in bytes.
    pub fn bytes_in_region(&self) -> usize {
        1 << self.log_bytes_in_region
    }
}
