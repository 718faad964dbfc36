//! The `protocol!` macro — declare a schema once, get identifiers, typed
//! invocation shims, and handler groups generated at compile time.
//!
//! ```ignore
//! cairn::protocol! {
//!     pub protocol chat_proto {
//!         interface chat: "chat" / "1.0" {
//!             method connect(creds: Creds, name: String) -> bool;
//!             method send(text: String);
//!             signal text_added(text: String);
//!         }
//!     }
//! }
//! ```
//!
//! Per interface this expands to a module holding `NAME`, `VERSION`, the
//! `ID` hash, an `Element` enum whose discriminants are the wire ordinals
//! (declaration order; methods and signals share the space), one typed
//! client shim per method, one typed emit shim per signal, and `Signals`/
//! `Methods` handler-group structs. Naming an element that does not exist,
//! or passing arguments that do not match its signature, fails the build.
//!
//! Argument and return types must implement `Encode`/`Decode` and be in
//! scope at the declaration site.

#[macro_export]
macro_rules! protocol {
    (
        $(#[$proto_meta:meta])*
        $vis:vis protocol $proto:ident {
            $(
                interface $iface:ident : $name:literal / $version:literal {
                    $( $kind:ident $elem:ident ( $( $arg:ident : $aty:ty ),* $(,)? ) $( -> $ret:ty )? ; )*
                }
            )+
        }
    ) => {
        $(#[$proto_meta])*
        $vis mod $proto {
            #![allow(unused_imports)]
            use super::*;

            /// Every element of this protocol, in declaration order.
            pub static ELEMENTS: &[$crate::ElementInfo] = &[
                $($(
                    $crate::ElementInfo {
                        interface_id: $iface::ID,
                        ordinal: $iface::Element::$elem as u16,
                        name: stringify!($elem),
                        kind: $crate::protocol!(@kind $kind),
                    },
                )*)+
            ];

            $(
                pub mod $iface {
                    #![allow(unused_imports)]
                    use super::super::*;

                    pub const NAME: &str = $name;
                    pub const VERSION: &str = $version;

                    /// `name_hash(NAME) ^ name_hash(VERSION)`.
                    pub const ID: u32 = $crate::interface_id($name, $version);

                    /// Elements in declaration order; discriminants are
                    /// the wire ordinals.
                    #[allow(non_camel_case_types)]
                    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
                    #[repr(u16)]
                    pub enum Element { $( $elem ),* }

                    $( $crate::protocol!(@shim $kind $elem ( $( $arg : $aty ),* ) $( -> $ret )? ); )*

                    $crate::protocol!(@signals_struct [ ] $( $kind $elem ( $( $arg : $aty ),* ) $( -> $ret )? ; )*);
                    $crate::protocol!(@methods_struct [ ] $( $kind $elem ( $( $arg : $aty ),* ) $( -> $ret )? ; )*);

                    impl $crate::SignalGroup for Signals {
                        fn interface_id(&self) -> u32 {
                            ID
                        }

                        #[allow(unused_variables)]
                        fn dispatch(
                            &mut self,
                            ordinal: u16,
                            parser: &mut $crate::Parser<'_>,
                        ) -> ::core::result::Result<bool, $crate::CodecError> {
                            let this = self;
                            $crate::protocol!(@signal_arms this, ordinal, parser,
                                $( $kind $elem ( $( $arg : $aty ),* ) $( -> $ret )? ; )*);
                            ::core::result::Result::Ok(false)
                        }
                    }

                    // A signal group can also sit on the server side of a
                    // dispatch loop: handled signals produce no reply.
                    impl $crate::MethodGroup for Signals {
                        fn interface_id(&self) -> u32 {
                            ID
                        }

                        fn dispatch(
                            &mut self,
                            header: &$crate::MsgHeader,
                            parser: &mut $crate::Parser<'_>,
                        ) -> ::core::result::Result<$crate::DispatchOutcome, $crate::CodecError> {
                            match $crate::SignalGroup::dispatch(self, header.ordinal(), parser)? {
                                true => ::core::result::Result::Ok($crate::DispatchOutcome::Done),
                                false => ::core::result::Result::Ok($crate::DispatchOutcome::Unhandled),
                            }
                        }
                    }

                    impl $crate::MethodGroup for Methods {
                        fn interface_id(&self) -> u32 {
                            ID
                        }

                        #[allow(unused_variables)]
                        fn dispatch(
                            &mut self,
                            header: &$crate::MsgHeader,
                            parser: &mut $crate::Parser<'_>,
                        ) -> ::core::result::Result<$crate::DispatchOutcome, $crate::CodecError> {
                            let this = self;
                            $crate::protocol!(@method_arms this, header, parser,
                                $( $kind $elem ( $( $arg : $aty ),* ) $( -> $ret )? ; )*);
                            ::core::result::Result::Ok($crate::DispatchOutcome::Unhandled)
                        }
                    }
                }
            )+
        }
    };

    // ── element kind tags ────────────────────────────────────────────────

    (@kind method) => { $crate::ElementKind::Method };
    (@kind signal) => { $crate::ElementKind::Signal };

    // ── typed shims ──────────────────────────────────────────────────────

    // Method with a reply.
    (@shim method $elem:ident ( $( $arg:ident : $aty:ty ),* ) -> $ret:ty) => {
        /// Invoke this method; `reply` runs exactly once when the reply
        /// arrives (or never, if the session ends first).
        pub fn $elem(
            client: &$crate::Client,
            $( $arg: $aty, )*
            reply: impl FnOnce($ret) + Send + 'static,
        ) -> ::core::result::Result<(), $crate::IpcError> {
            client.invoke(
                ID,
                Element::$elem as u16,
                |packet| {
                    let _ = &packet;
                    $( $crate::Encode::encode(&$arg, packet); )*
                },
                Some($crate::client::reply_decoder(move |parser| {
                    reply(<$ret as $crate::Decode<'_>>::decode(parser)?);
                    Ok(())
                })),
            )
        }
    };

    // Void method: fire-and-forget, no reply entry, no reply packet.
    (@shim method $elem:ident ( $( $arg:ident : $aty:ty ),* )) => {
        pub fn $elem(
            client: &$crate::Client,
            $( $arg: $aty, )*
        ) -> ::core::result::Result<(), $crate::IpcError> {
            client.invoke(
                ID,
                Element::$elem as u16,
                |packet| {
                    let _ = &packet;
                    $( $crate::Encode::encode(&$arg, packet); )*
                },
                None,
            )
        }
    };

    // Signal: emitted by the server session, cookie zero on the wire.
    (@shim signal $elem:ident ( $( $arg:ident : $aty:ty ),* )) => {
        pub fn $elem(
            session: &$crate::ServerSession,
            $( $arg: $aty, )*
        ) -> ::core::result::Result<(), $crate::IpcError> {
            session.send_signal(
                ID,
                Element::$elem as u16,
                |packet| {
                    let _ = &packet;
                    $( $crate::Encode::encode(&$arg, packet); )*
                },
            )
        }
    };

    // ── handler-group structs (munchers filter by element kind) ──────────

    (@signals_struct [ $( $done:tt )* ]
        signal $elem:ident ( $( $arg:ident : $aty:ty ),* ) ; $( $rest:tt )*) => {
        $crate::protocol!(@signals_struct
            [ $( $done )* pub $elem: Option<Box<dyn FnMut( $( $aty ),* ) + Send>>, ]
            $( $rest )*);
    };
    (@signals_struct [ $( $done:tt )* ]
        method $elem:ident ( $( $arg:ident : $aty:ty ),* ) $( -> $ret:ty )? ; $( $rest:tt )*) => {
        $crate::protocol!(@signals_struct [ $( $done )* ] $( $rest )*);
    };
    (@signals_struct [ $( $done:tt )* ]) => {
        /// Signal handlers for this interface. Unset entries consume and
        /// discard the message.
        #[derive(Default)]
        pub struct Signals { $( $done )* }
    };

    (@methods_struct [ $( $done:tt )* ]
        method $elem:ident ( $( $arg:ident : $aty:ty ),* ) -> $ret:ty ; $( $rest:tt )*) => {
        $crate::protocol!(@methods_struct
            [ $( $done )* pub $elem: Option<Box<dyn FnMut( $( $aty ),* ) -> $ret + Send>>, ]
            $( $rest )*);
    };
    (@methods_struct [ $( $done:tt )* ]
        method $elem:ident ( $( $arg:ident : $aty:ty ),* ) ; $( $rest:tt )*) => {
        $crate::protocol!(@methods_struct
            [ $( $done )* pub $elem: Option<Box<dyn FnMut( $( $aty ),* ) + Send>>, ]
            $( $rest )*);
    };
    (@methods_struct [ $( $done:tt )* ]
        signal $elem:ident ( $( $arg:ident : $aty:ty ),* ) ; $( $rest:tt )*) => {
        $crate::protocol!(@methods_struct [ $( $done )* ] $( $rest )*);
    };
    (@methods_struct [ $( $done:tt )* ]) => {
        /// Method handlers for this interface. Unset entries consume and
        /// discard the message.
        #[derive(Default)]
        pub struct Methods { $( $done )* }
    };

    // ── dispatch arms ────────────────────────────────────────────────────

    (@signal_arms $this:ident, $ordinal:ident, $parser:ident,
        signal $elem:ident ( $( $arg:ident : $aty:ty ),* ) ; $( $rest:tt )*) => {
        if $ordinal == Element::$elem as u16 {
            $( let $arg = <$aty as $crate::Decode<'_>>::decode($parser)?; )*
            if let Some(handler) = $this.$elem.as_mut() {
                handler( $( $arg ),* );
                return ::core::result::Result::Ok(true);
            }
            return ::core::result::Result::Ok(false);
        }
        $crate::protocol!(@signal_arms $this, $ordinal, $parser, $( $rest )*);
    };
    (@signal_arms $this:ident, $ordinal:ident, $parser:ident,
        method $elem:ident ( $( $arg:ident : $aty:ty ),* ) $( -> $ret:ty )? ; $( $rest:tt )*) => {
        $crate::protocol!(@signal_arms $this, $ordinal, $parser, $( $rest )*);
    };
    (@signal_arms $this:ident, $ordinal:ident, $parser:ident,) => {};

    (@method_arms $this:ident, $header:ident, $parser:ident,
        method $elem:ident ( $( $arg:ident : $aty:ty ),* ) -> $ret:ty ; $( $rest:tt )*) => {
        if $header.ordinal() == Element::$elem as u16 {
            $( let $arg = <$aty as $crate::Decode<'_>>::decode($parser)?; )*
            if let Some(handler) = $this.$elem.as_mut() {
                let value: $ret = handler( $( $arg ),* );
                let mut reply = $crate::Packet::new($crate::MsgHeader::reply_to($header));
                $crate::Encode::encode(&value, &mut reply);
                return ::core::result::Result::Ok($crate::DispatchOutcome::Reply(reply));
            }
            return ::core::result::Result::Ok($crate::DispatchOutcome::Unhandled);
        }
        $crate::protocol!(@method_arms $this, $header, $parser, $( $rest )*);
    };
    (@method_arms $this:ident, $header:ident, $parser:ident,
        method $elem:ident ( $( $arg:ident : $aty:ty ),* ) ; $( $rest:tt )*) => {
        if $header.ordinal() == Element::$elem as u16 {
            $( let $arg = <$aty as $crate::Decode<'_>>::decode($parser)?; )*
            if let Some(handler) = $this.$elem.as_mut() {
                handler( $( $arg ),* );
                return ::core::result::Result::Ok($crate::DispatchOutcome::Done);
            }
            return ::core::result::Result::Ok($crate::DispatchOutcome::Unhandled);
        }
        $crate::protocol!(@method_arms $this, $header, $parser, $( $rest )*);
    };
    (@method_arms $this:ident, $header:ident, $parser:ident,
        signal $elem:ident ( $( $arg:ident : $aty:ty ),* ) ; $( $rest:tt )*) => {
        $crate::protocol!(@method_arms $this, $header, $parser, $( $rest )*);
    };
    (@method_arms $this:ident, $header:ident, $parser:ident,) => {};
}
