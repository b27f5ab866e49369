#![no_main]
use dson::{BinReader, ContextType, DsonType};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut r = BinReader::from_slice(data);
    for _ in 0..65536 {
        let ty = match r.read_dson_type() {
            Ok(ty) => ty,
            Err(_) => break,
        };
        let step = match ty {
            DsonType::EndOfObject => match r.context_type() {
                ContextType::TopLevel => break,
                ContextType::Object => r.read_end_object(),
                ContextType::Array => r.read_end_array(),
                ContextType::Header => r.read_end_header(),
            },
            DsonType::Object => r.read_start_object().map(|_| ()),
            DsonType::Array => r.read_start_array().map(|_| ()),
            DsonType::Header => r.read_start_header().map(|_| ()),
            _ => r.skip_value(),
        };
        if step.is_err() {
            break;
        }
    }
});
