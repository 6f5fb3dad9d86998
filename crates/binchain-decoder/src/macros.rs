// Generates the named word readers (`word8`, `word16le`, `word32bs`, ...)
// on a type that has `fn word(&mut self, name, WordOp) -> $ret`. Every
// alias from the DSL name table gets its own method.
macro_rules! word_methods {
    ($ret:ty) => {
        word_methods!(@gen $ret;
            word8 => U8, word8u => U8,
            word8be => U8, word8bu => U8, word8le => U8, word8lu => U8,
            word8s => S8, word8bs => S8, word8ls => S8,
            word16le => U16_LE, word16lu => U16_LE, word16ls => S16_LE,
            word16be => U16_BE, word16bu => U16_BE, word16bs => S16_BE,
            word32le => U32_LE, word32lu => U32_LE, word32ls => S32_LE,
            word32be => U32_BE, word32bu => U32_BE, word32bs => S32_BE,
            word64le => U64_LE, word64lu => U64_LE, word64ls => S64_LE,
            word64be => U64_BE, word64bu => U64_BE, word64bs => S64_BE,
        );
    };
    (@gen $ret:ty; $($method:ident => $op:ident),* $(,)?) => {
        $(
            #[doc = concat!(
                "Read one `",
                stringify!($method),
                "` word and store it under `name`.",
            )]
            pub fn $method(&mut self, name: impl Into<String>) -> $ret {
                self.word(name, ::binchain_wire::WordOp::$op)
            }
        )*
    };
}
