#![no_main]
use libfuzzer_sys::fuzz_target;

use async_dup::{Arc, Mutex};
use futures_lite::io::Cursor;
use wire_h1::server::{self, default_headers, StatusCode};
use wire_h1::Duplex;

fuzz_target!(|request: &[u8]| {
    let io = Duplex::new(
        Arc::new(Mutex::new(Cursor::new(request.to_vec()))),
        Arc::new(Mutex::new(Cursor::new(Vec::new()))),
    );
    futures_lite::future::block_on(server::accept(io, |mut res, req| async move {
        let _ = res.write_status_line(StatusCode::Ok).await;
        let _ = res.write_headers(&default_headers(req.body().len())).await;
        let _ = res.write_body(req.body()).await;
    }))
    .ok();
});
