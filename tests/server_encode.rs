mod server_encode {
    use pretty_assertions::assert_eq;
    use wire_h1::server::{default_headers, ResponseWriter, StatusCode, WriterState};
    use wire_h1::{Error, Headers, Result, WriterOrderError};

    fn writer() -> ResponseWriter<Vec<u8>> {
        ResponseWriter::new(Vec::new())
    }

    fn written(res: ResponseWriter<Vec<u8>>) -> String {
        String::from_utf8(res.into_inner()).unwrap()
    }

    #[async_std::test]
    async fn fixed_length_response() -> Result<()> {
        let mut res = writer();
        res.write_status_line(StatusCode::Ok).await?;
        res.write_headers(&default_headers(13)).await?;
        res.write_body(b"Hello World!\n").await?;

        assert_eq!(
            written(res),
            "HTTP/1.1 200 OK\r\nContent-Length: 13\r\nConnection: close\r\nContent-Type: text/plain\r\n\r\nHello World!\n"
        );
        Ok(())
    }

    #[async_std::test]
    async fn body_before_headers_writes_nothing() {
        let mut res = writer();
        let err = res.write_body(b"hello").await.unwrap_err();
        assert!(matches!(
            err,
            Error::WriterOrder(WriterOrderError::StatusLineFirst)
        ));

        res.write_status_line(StatusCode::Ok).await.unwrap();
        let err = res.write_body(b"hello").await.unwrap_err();
        assert!(matches!(err, Error::WriterOrder(WriterOrderError::HeadersFirst)));

        assert_eq!(res.state(), WriterState::Headers);
        assert_eq!(written(res), "HTTP/1.1 200 OK\r\n");
    }

    #[async_std::test]
    async fn headers_before_status_line_are_rejected() {
        let mut res = writer();
        let err = res.write_headers(&Headers::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "incorrect order of response: first print status line");
        assert!(res.into_inner().is_empty());
    }

    #[async_std::test]
    async fn headers_are_written_once() -> Result<()> {
        let mut res = writer();
        res.write_status_line(StatusCode::Ok).await?;
        res.write_headers(&default_headers(0)).await?;
        let err = res.write_headers(&default_headers(0)).await.unwrap_err();
        assert!(matches!(err, Error::WriterOrder(WriterOrderError::HeadersWritten)));
        Ok(())
    }

    #[async_std::test]
    async fn chunked_body_with_trailers() -> Result<()> {
        let headers = Headers::try_from([("Transfer-Encoding", "chunked"), ("Trailer", "X")])?;

        let mut res = writer();
        res.write_status_line(StatusCode::Ok).await?;
        res.write_headers(&headers).await?;
        assert_eq!(res.write_chunked_body(b"hello").await?, 5);
        res.write_chunked_body_done().await?;
        assert_eq!(res.state(), WriterState::Trailers);

        let trailers = Headers::try_from([("X", "1")])?;
        res.write_trailers(&trailers).await?;
        assert_eq!(res.state(), WriterState::Done);

        assert_eq!(
            written(res),
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nTrailer: X\r\n\r\n5\r\nhello\r\n0\r\nX: 1\r\n\r\n"
        );
        Ok(())
    }

    #[async_std::test]
    async fn trailers_emit_the_last_chunk_when_missing() -> Result<()> {
        let mut res = writer();
        res.write_status_line(StatusCode::Ok).await?;
        res.write_headers(&Headers::new()).await?;
        res.write_chunked_body(b"0123456789abcdef!").await?;
        res.write_trailers(&Headers::new()).await?;

        assert_eq!(
            written(res),
            "HTTP/1.1 200 OK\r\n\r\n11\r\n0123456789abcdef!\r\n0\r\n\r\n"
        );
        Ok(())
    }

    #[async_std::test]
    async fn empty_chunks_are_skipped() -> Result<()> {
        let mut res = writer();
        res.write_status_line(StatusCode::Ok).await?;
        res.write_headers(&Headers::new()).await?;
        assert_eq!(res.write_chunked_body(b"").await?, 0);
        assert_eq!(res.state(), WriterState::Body);
        assert_eq!(written(res), "HTTP/1.1 200 OK\r\n\r\n");
        Ok(())
    }

    #[async_std::test]
    async fn completed_response_rejects_everything() -> Result<()> {
        let mut res = writer();
        res.write_status_line(StatusCode::Ok).await?;
        res.write_headers(&Headers::new()).await?;
        res.write_trailers(&Headers::new()).await?;
        let before = res.get_ref().len();

        let completed = |result: Result<()>| {
            matches!(
                result,
                Err(Error::WriterOrder(WriterOrderError::Completed))
            )
        };
        assert!(completed(res.write_status_line(StatusCode::Ok).await));
        assert!(completed(res.write_headers(&Headers::new()).await));
        assert!(completed(res.write_body(b"late").await));
        assert!(completed(res.write_chunked_body(b"late").await.map(drop)));
        assert!(completed(res.write_chunked_body_done().await));
        assert!(completed(res.write_trailers(&Headers::new()).await));

        assert_eq!(res.get_ref().len(), before);
        Ok(())
    }

    #[async_std::test]
    async fn body_is_rejected_after_the_last_chunk() -> Result<()> {
        let mut res = writer();
        res.write_status_line(StatusCode::Ok).await?;
        res.write_headers(&Headers::new()).await?;
        res.write_chunked_body_done().await?;

        let err = res.write_chunked_body(b"more").await.unwrap_err();
        assert!(matches!(err, Error::WriterOrder(WriterOrderError::Completed)));
        Ok(())
    }

    #[async_std::test]
    async fn error_statuses() -> Result<()> {
        let mut res = writer();
        res.write_status_line(StatusCode::InternalServerError).await?;
        assert_eq!(written(res), "HTTP/1.1 500 Internal Server Error\r\n");
        Ok(())
    }
}
