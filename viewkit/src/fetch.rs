//! Retrieval of lens modules published over HTTP.

use std::io::Read;

use log::debug;

use crate::Error;

/// Downloads the module at the given URL. Any response status other than
/// 200 is an error.
pub fn fetch_module(url: &str) -> Result<Vec<u8>, Error> {
    let response = match ureq::get(url).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(status, _)) => {
            return Err(Error::UnexpectedStatus(url.to_string(), status))
        }
        Err(e) => return Err(Error::Fetch(url.to_string(), e.to_string())),
    };
    if response.status() != 200 {
        return Err(Error::UnexpectedStatus(url.to_string(), response.status()));
    }
    let mut module = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut module)
        .map_err(|e| Error::io(format!("reading response from {}", url), e))?;
    debug!("Fetched {} bytes from {}", module.len(), url);
    Ok(module)
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serves a single canned HTTP response on a local port and returns the
    /// URL to request.
    pub(crate) fn serve_once(status: &str, body: &[u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/wasm\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(body);
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 4096];
            let _ = stream.read(&mut request);
            stream.write_all(&response).unwrap();
        });
        format!("http://{}/lens.wasm", addr)
    }

    #[test]
    fn successful_download() {
        let url = serve_once("200 OK", b"\0asm\x01\0\0\0");
        assert_eq!(fetch_module(&url).unwrap(), b"\0asm\x01\0\0\0".to_vec());
    }

    #[test]
    fn non_ok_status_is_an_error() {
        let url = serve_once("404 Not Found", b"");
        assert!(matches!(
            fetch_module(&url),
            Err(Error::UnexpectedStatus(u, 404)) if u == url
        ));
        let url = serve_once("204 No Content", b"");
        assert!(matches!(
            fetch_module(&url),
            Err(Error::UnexpectedStatus(_, 204))
        ));
    }

    #[test]
    fn unreachable_host_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert!(matches!(
            fetch_module(&format!("http://{}/lens.wasm", addr)),
            Err(Error::Fetch(_, _))
        ));
    }
}
