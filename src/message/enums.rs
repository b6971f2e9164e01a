//! Integer-coded enumerations carried in gateway messages.
//!
//! Every enumeration has an `Undefined` variant that absorbs codes outside
//! the known range. Whether `Undefined` is acceptable on decode depends on
//! the field; see [`crate::codec`].

use super::PARAM_UNDEFINED;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            /// Code outside the range the protocol defines.
            #[default]
            Undefined,
        }

        impl $name {
            /// Map an on-wire code, folding unknown codes into `Undefined`.
            #[must_use]
            pub const fn from_code(code: i32) -> Self {
                match code {
                    $($code => Self::$variant,)+
                    _ => Self::Undefined,
                }
            }

            /// Return the on-wire code.
            #[must_use]
            pub const fn code(self) -> i32 {
                match self {
                    $(Self::$variant => $code,)+
                    Self::Undefined => PARAM_UNDEFINED,
                }
            }

            /// Whether this value is the `Undefined` sentinel.
            #[must_use]
            pub const fn is_undefined(self) -> bool { matches!(self, Self::Undefined) }
        }
    };
}

wire_enum! {
    /// Command carried by an [`Admin`](super::Admin) message.
    AdminCommand {
        Shutdown = 0,
        Suspend = 1,
        Resume = 2,
        /// Handshake naming the connecting box.
        Identify = 3,
        Restart = 4,
    }
}

wire_enum! {
    /// Outcome reported by an [`Ack`](super::Ack).
    AckType {
        Success = 0,
        Failed = 1,
        /// Temporary failure; the message may be retried.
        FailedTmp = 2,
        Buffered = 3,
    }
}

wire_enum! {
    /// Direction and purpose of an [`Sms`](super::Sms).
    SmsType {
        /// Mobile originated.
        Mo = 0,
        /// Mobile terminated reply to an earlier MO message.
        MtReply = 1,
        /// Mobile terminated push.
        MtPush = 2,
        /// Delivery report for an MO message.
        ReportMo = 3,
        /// Delivery report for an MT message.
        ReportMt = 4,
    }
}

wire_enum! {
    /// GSM message class.
    MessageClass {
        Class0 = 0,
        Class1 = 1,
        Class2 = 2,
        Class3 = 3,
    }
}

wire_enum! {
    /// Message waiting indicator.
    MessageWaitingIndicator {
        VoiceOn = 0,
        FaxOn = 1,
        EmailOn = 2,
        OtherOn = 3,
        VoiceOff = 4,
        FaxOff = 5,
        EmailOff = 6,
        OtherOff = 7,
    }
}

wire_enum! {
    /// Data coding scheme of the message body.
    DataCoding {
        Gsm7Bit = 0,
        Octet8Bit = 1,
        Ucs2 = 2,
    }
}

wire_enum! {
    /// Whether the message body is compressed.
    Compress {
        Off = 0,
        On = 1,
    }
}

wire_enum! {
    /// Return path indicator.
    ReturnPathIndicator {
        Off = 0,
        On = 1,
    }
}
